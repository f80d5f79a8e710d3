mod request_queue;

pub use request_queue::RequestQueue;
