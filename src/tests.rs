mod cache;
mod decode;
