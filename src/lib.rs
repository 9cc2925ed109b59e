#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use ge_rtti as rtti;
pub use ge_utils as utils;
