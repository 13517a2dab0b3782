// src/court.rs
//
// Fixed court geometry. A FIBA court is 28m x 15m; the landmark table below
// is the reference set the keypoint detector is trained against, expressed
// in court meters with the origin at the left baseline / near sideline
// corner, x along the length, y along the width.

/// Court length in meters (baseline to baseline).
pub const COURT_LENGTH_M: f32 = 28.0;
/// Court width in meters (sideline to sideline).
pub const COURT_WIDTH_M: f32 = 15.0;

/// Number of reference landmarks. Keypoint ids index into this table.
pub const NUM_KEYPOINTS: usize = 18;

// Lane (key) edges sit 4.9m apart centered on the court; the free-throw
// line is 5.8m from the baseline; the three-point arc apex is 8.325m out
// (1.575m hoop offset + 6.75m radius); the center circle radius is 1.8m.
pub const REFERENCE_KEYPOINTS: [[f32; 2]; NUM_KEYPOINTS] = [
    [0.0, 0.0],    //  0 left baseline, near corner
    [0.0, 5.05],   //  1 left baseline, near lane edge
    [0.0, 9.95],   //  2 left baseline, far lane edge
    [0.0, 15.0],   //  3 left baseline, far corner
    [5.8, 5.05],   //  4 left free-throw line, near lane corner
    [5.8, 9.95],   //  5 left free-throw line, far lane corner
    [8.325, 7.5],  //  6 left three-point apex
    [14.0, 0.0],   //  7 midcourt, near sideline
    [14.0, 5.7],   //  8 center circle, near
    [14.0, 9.3],   //  9 center circle, far
    [14.0, 15.0],  // 10 midcourt, far sideline
    [19.675, 7.5], // 11 right three-point apex
    [22.2, 5.05],  // 12 right free-throw line, near lane corner
    [22.2, 9.95],  // 13 right free-throw line, far lane corner
    [28.0, 0.0],   // 14 right baseline, near corner
    [28.0, 5.05],  // 15 right baseline, near lane edge
    [28.0, 9.95],  // 16 right baseline, far lane edge
    [28.0, 15.0],  // 17 right baseline, far corner
];

/// Real-world distance in meters between two landmarks.
pub fn landmark_distance(a: usize, b: usize) -> f32 {
    let pa = REFERENCE_KEYPOINTS[a];
    let pb = REFERENCE_KEYPOINTS[b];
    let dx = pa[0] - pb[0];
    let dy = pa[1] - pb[1];
    (dx * dx + dy * dy).sqrt()
}
