pub mod ask;
pub mod documents;
pub mod health;
pub mod jobs;
pub mod models;
pub mod page;
pub mod ui;
