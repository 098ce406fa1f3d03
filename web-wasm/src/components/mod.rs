//! UIコンポーネント

pub mod intro;
pub mod progress_bar;
pub mod questionnaire;
pub mod result_panel;
pub mod upload_area;
