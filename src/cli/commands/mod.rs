//! One module per subcommand.

pub mod data_key;
pub mod decrypt;
pub mod encrypt;
pub mod init;
pub mod keys;
pub mod re_encrypt;
