pub mod org_iso_18013_5_1;
