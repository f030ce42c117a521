mod common;
mod specialized;
