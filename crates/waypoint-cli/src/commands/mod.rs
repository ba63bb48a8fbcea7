pub mod publish;
pub mod watch;
