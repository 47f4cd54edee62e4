use std::f64::consts::PI;

use nalgebra::Vector3;

/// Wraps an angle into `(-π, π]`.
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = angle.sin().atan2(angle.cos());
    if wrapped <= -PI {
        PI
    } else {
        wrapped
    }
}

/// Observation angle `alpha` of a camera-frame box.
///
/// The heading relative to the ray from the camera centre to the object,
/// measured in the x/z plane: `wrap(heading + atan2(z, x) + 1.5π)`.
pub fn observation_angle(location: &Vector3<f64>, heading: f64) -> f64 {
    let alpha = heading - (-location.z.atan2(location.x) - 1.5 * PI);
    wrap_angle(alpha)
}
