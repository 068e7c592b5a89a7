use ndarray::ArrayView1;

use crate::util::safe_ln;

/// Return the loss and gradient of the co-occurrence classification.
///
/// This function returns the negative log likelihood and gradient of a
/// training instance using the probability function
/// *P(1|x) = σ(u·v + b)*. `u` is an input embedding, `v` and `b` the
/// output embedding and bias of the predicted word, and `label` the
/// target, where `1` means that the words co-occur and `0` that they
/// do not.
///
/// The model resembles logistic regression, except that both u and v
/// are optimized. With z = u·v + b and y the label, the loss is
///
/// -log(P(y|x)) = -[y log(σ(z)) + (1-y) log(σ(-z))]
///
/// and the partial derivative with respect to z is y - σ(z). We return
/// y - σ(z) as the gradient, so that the caller can compute the
/// gradient for all components of u, v and b.
pub(crate) fn log_logistic_loss(
    u: ArrayView1<f32>,
    v: ArrayView1<f32>,
    bias: f32,
    label: bool,
) -> (f32, f32) {
    let z = u.dot(&v) + bias;
    let lf = logistic_function(z);
    let grad = (label as usize) as f32 - lf;
    let loss = if label {
        -safe_ln(lf)
    } else {
        -safe_ln(1.0 - lf)
    };

    (loss, grad)
}

/// Binary cross-entropy of a logit against a boolean target.
///
/// **-[y ln σ(z) + (1-y) ln σ(-z)]**
pub(crate) fn sigmoid_cross_entropy(logit: f32, label: bool) -> f32 {
    let lf = logistic_function(logit);
    if label {
        -safe_ln(lf)
    } else {
        -safe_ln(1.0 - lf)
    }
}

/// Compute the logistic function.
///
/// **σ(a) = 1 / (1 + e^{-a})**
pub(crate) fn logistic_function(a: f32) -> f32 {
    1.0 / (1.0 + (-a).exp())
}

/// Numerically stable log of the sum of exponentials.
pub(crate) fn log_sum_exp(logits: ArrayView1<f32>) -> f32 {
    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let sum = logits.iter().map(|&z| (z - max).exp()).sum::<f32>();
    max + sum.ln()
}
