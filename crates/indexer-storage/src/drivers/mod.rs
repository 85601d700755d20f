pub mod file;
pub mod ftp;
pub mod http;
pub mod null;
