pub mod arguments;
pub mod config;
pub mod errors;
pub mod feed;
pub mod logger;
pub mod record;
pub mod run;
pub mod webserver;
