//! HTTP request handlers for the web server.

mod api_types;
mod archive;
mod scrape;
mod static_files;

pub use archive::{
    health, list_courses, search_get, search_post, search_suggestions, thread_images,
};
pub use scrape::{list_tasks, scrape_status, submit_scrape};
pub use static_files::{serve_image, serve_pdf};
