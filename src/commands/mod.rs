pub mod check;
pub mod export;
pub mod init;
pub mod slas;
pub mod whoami;
