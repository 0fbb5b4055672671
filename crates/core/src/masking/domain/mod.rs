pub mod region_masker;
