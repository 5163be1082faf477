mod dispatch;
mod memory;
