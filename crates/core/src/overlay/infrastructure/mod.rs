pub mod rgba_overlay;
