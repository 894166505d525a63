pub(crate) mod align;
pub(crate) mod error;
pub(crate) mod format;
pub(crate) mod mode;
pub(crate) mod serializable;
