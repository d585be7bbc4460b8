mod details;
mod list;
mod panels;
