pub mod config;
pub mod effect;
pub mod error;
pub mod events;
pub mod processing {
    pub mod layout;
    pub mod pointer;
}
pub mod render {
    pub mod pipeline;
    pub mod reflect;
    pub mod surface;
}
pub mod tasks {
    pub mod check;
    pub mod loader;
    pub mod viewer;
}
