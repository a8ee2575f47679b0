mod config;
mod framing;
mod session;
