pub(crate) mod compose;
pub(crate) mod layout;
pub(crate) mod overlay;
