//! Camera intrinsics for the query camera.
//!
//! `CameraModel` captures the physical parameters of the drone camera and
//! freezes the derived quantities (FOV in radians, aspect ratio, focal
//! length in pixels, principal point) at construction. The pipeline only
//! consumes it during query preprocessing; no direct geometry in the
//! matching core depends on it.

/// Query camera intrinsics with derived values computed at construction.
#[derive(Debug, Clone)]
pub struct CameraModel {
    /// Focal length in millimeters.
    pub focal_length_mm: f64,
    /// Sensor resolution width in pixels.
    pub resolution_width: u32,
    /// Sensor resolution height in pixels.
    pub resolution_height: u32,
    /// Horizontal field of view in degrees.
    pub hfov_deg: f64,
    hfov_rad: f64,
    aspect_ratio: f64,
    focal_length_px: f64,
    principal_point: [f64; 2],
}

impl CameraModel {
    /// Build a camera model; the principal point defaults to the image
    /// center.
    pub fn new(
        focal_length_mm: f64,
        resolution_width: u32,
        resolution_height: u32,
        hfov_deg: f64,
    ) -> Self {
        let hfov_rad = hfov_deg.to_radians();
        let w = resolution_width as f64;
        let h = resolution_height as f64;
        Self {
            focal_length_mm,
            resolution_width,
            resolution_height,
            hfov_deg,
            hfov_rad,
            aspect_ratio: w / h,
            focal_length_px: w / (2.0 * (hfov_rad / 2.0).tan()),
            principal_point: [w / 2.0, h / 2.0],
        }
    }

    /// Horizontal field of view in radians.
    pub fn hfov_rad(&self) -> f64 {
        self.hfov_rad
    }

    /// Width / height.
    pub fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }

    /// Focal length in pixels: `width / (2 tan(hfov/2))`.
    pub fn focal_length_px(&self) -> f64 {
        self.focal_length_px
    }

    /// Principal point `[x, y]` in pixels.
    pub fn principal_point(&self) -> [f64; 2] {
        self.principal_point
    }

    /// Sensor resolution as `(width, height)`.
    pub fn resolution(&self) -> (u32, u32) {
        (self.resolution_width, self.resolution_height)
    }
}
