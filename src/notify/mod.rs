pub mod email;

pub use email::{parse_recipient, EmailSender};
