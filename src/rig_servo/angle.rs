// ==============================================================================
// angle.rs — SIGNED RELATIVE JOINT ANGLE
// ==============================================================================
// One convention, used by the joint controller, the angle limiter and the debug
// overlay alike:
//
//   a   = parent_rot * axis_parent          (joint axis in world)
//   r_p = parent_rot * reference_parent     (reference fixed in the parent)
//   r_c = child_rot  * reference_child      (reference fixed in the child)
//
//   project r_p, r_c onto the plane normal to a, then
//   θ = atan2( a · (r_p × r_c), r_p · r_c )          θ ∈ (-π, π]
//
// The references are the ones used at construction time ("up" for elevation
// joints, "forward" for yaw joints). For a pure hinge rotation θ is exactly the
// rotation of the child about the axis; off-axis wobble is discarded by the
// projection.
//
// Readings this is NOT equal to, and where they diverge:
// - half-angle of the relative quaternion, 2·atan2(|v|, w) or 2·atan2(x, w):
//   unsigned (first form) or taken about the child's local X instead of the
//   hinge axis (second form), and it absorbs off-axis wobble into θ instead of
//   discarding it. Wraps at ±2π around the double cover, not ±π.
// - acos(r_p · r_c): loses the sign, so +θ and −θ read the same, and folds
//   everything into [0, π].
// On a pure hinge rotation inside (-π, π] all three agree in magnitude.
// ==============================================================================

use nalgebra::{UnitQuaternion, Vector3};

/// Signed angle from `from` to `to` measured about `axis` (right-hand rule).
///
/// Returns 0 when either vector is (nearly) parallel to the axis.
pub fn signed_angle_about_axis(from: &Vector3<f32>, to: &Vector3<f32>, axis: &Vector3<f32>) -> f32 {
    let Some(a) = axis.try_normalize(1e-6) else {
        return 0.0;
    };
    let p = from - a * from.dot(&a);
    let c = to - a * to.dot(&a);
    if p.norm_squared() < 1e-12 || c.norm_squared() < 1e-12 {
        return 0.0;
    }
    a.dot(&p.cross(&c)).atan2(p.dot(&c))
}

/// Relative angle of a child body about its hinge, given both world orientations
/// and the joint's body-local axis/reference vectors.
pub fn joint_angle(
    parent_rot: &UnitQuaternion<f32>,
    child_rot: &UnitQuaternion<f32>,
    axis_parent: &Vector3<f32>,
    reference_parent: &Vector3<f32>,
    reference_child: &Vector3<f32>,
) -> f32 {
    let axis = parent_rot * axis_parent;
    let r_p = parent_rot * reference_parent;
    let r_c = child_rot * reference_child;
    signed_angle_about_axis(&r_p, &r_c, &axis)
}
