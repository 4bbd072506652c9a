//! IO modules - side effects (archives, filesystem)

pub mod archive;
pub mod extract;
pub mod inspect;
pub mod workdir;
