mod builder;
mod client;
