mod platform;
mod worker;
