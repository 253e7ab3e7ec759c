pub mod about_section;
pub mod header;
pub mod history_section;
pub mod live_section;
pub mod upload_section;
