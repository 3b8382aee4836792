pub mod weeklog;
