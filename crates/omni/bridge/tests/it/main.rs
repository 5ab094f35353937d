mod configurator;
mod remote_create;
