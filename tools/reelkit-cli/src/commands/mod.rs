pub mod captions;
pub mod export;
pub mod fetch;
pub mod frame;
pub mod inspect;
pub mod preview;
