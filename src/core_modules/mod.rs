pub mod blob_classifier;
pub mod calibration_grid;
pub mod chord_deduper;
pub mod contour_extractor;
pub mod note_table;
pub mod pitch_resolver;
pub mod pixel;
pub mod tone_trigger;
pub mod tracking_window;
