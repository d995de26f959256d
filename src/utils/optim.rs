//! Derivative-free minimization used for model parameter estimation.

/// Options controlling the Nelder-Mead simplex search.
#[derive(Debug, Clone)]
pub struct SimplexOptions {
    /// Maximum number of iterations.
    pub max_iterations: usize,
    /// Stop when the spread of objective values across the simplex falls
    /// below this tolerance.
    pub tolerance: f64,
    /// Relative step used to build the initial simplex.
    pub initial_step: f64,
}

impl Default for SimplexOptions {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-8,
            initial_step: 0.05,
        }
    }
}

/// Outcome of a simplex minimization.
#[derive(Debug, Clone)]
pub struct SimplexOutcome {
    /// Best point found.
    pub point: Vec<f64>,
    /// Objective value at the best point.
    pub value: f64,
    /// Iterations performed.
    pub iterations: usize,
    /// Whether the tolerance criterion was met.
    pub converged: bool,
}

// Standard Nelder-Mead coefficients.
const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Minimize `objective` starting from `initial` using the Nelder-Mead
/// simplex method, optionally clamping every trial point to `bounds`.
pub fn nelder_mead<F>(
    objective: F,
    initial: &[f64],
    bounds: Option<&[(f64, f64)]>,
    options: SimplexOptions,
) -> SimplexOutcome
where
    F: Fn(&[f64]) -> f64,
{
    let dim = initial.len();
    if dim == 0 {
        return SimplexOutcome {
            point: vec![],
            value: f64::NAN,
            iterations: 0,
            converged: false,
        };
    }

    let clamp = |point: &[f64]| -> Vec<f64> {
        match bounds {
            Some(b) => point
                .iter()
                .zip(b.iter())
                .map(|(&x, &(lo, hi))| x.clamp(lo, hi))
                .collect(),
            None => point.to_vec(),
        }
    };

    // Initial simplex: the start point plus one perturbed vertex per axis.
    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(dim + 1);
    simplex.push(clamp(initial));
    for axis in 0..dim {
        let mut vertex = initial.to_vec();
        let step = if initial[axis].abs() > 1e-10 {
            options.initial_step * initial[axis].abs()
        } else {
            options.initial_step
        };
        vertex[axis] += step;
        simplex.push(clamp(&vertex));
    }

    let mut scores: Vec<f64> = simplex.iter().map(|v| objective(v)).collect();

    let mut iterations = 0;
    let mut converged = false;

    while iterations < options.max_iterations {
        iterations += 1;

        // Order vertices best-to-worst.
        let mut order: Vec<usize> = (0..=dim).collect();
        order.sort_by(|&a, &b| {
            scores[a]
                .partial_cmp(&scores[b])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let best = order[0];
        let second_worst = order[dim - 1];
        let worst = order[dim];

        if scores[worst] - scores[best] < options.tolerance {
            converged = true;
            break;
        }

        // Centroid of all vertices except the worst.
        let mut centroid = vec![0.0; dim];
        for (i, vertex) in simplex.iter().enumerate() {
            if i == worst {
                continue;
            }
            for (c, &x) in centroid.iter_mut().zip(vertex.iter()) {
                *c += x;
            }
        }
        for c in centroid.iter_mut() {
            *c /= dim as f64;
        }

        let towards = |from: &[f64], coeff: f64| -> Vec<f64> {
            let moved: Vec<f64> = centroid
                .iter()
                .zip(from.iter())
                .map(|(&c, &x)| c + coeff * (c - x))
                .collect();
            clamp(&moved)
        };

        let reflected = towards(&simplex[worst], REFLECT);
        let reflected_score = objective(&reflected);

        if reflected_score < scores[best] {
            // Try stretching further in the same direction.
            let expanded = towards(&simplex[worst], EXPAND);
            let expanded_score = objective(&expanded);
            if expanded_score < reflected_score {
                simplex[worst] = expanded;
                scores[worst] = expanded_score;
            } else {
                simplex[worst] = reflected;
                scores[worst] = reflected_score;
            }
            continue;
        }

        if reflected_score < scores[second_worst] {
            simplex[worst] = reflected;
            scores[worst] = reflected_score;
            continue;
        }

        // Contract towards the centroid, from whichever of the worst and the
        // reflected point scores lower.
        let (anchor, anchor_score) = if reflected_score < scores[worst] {
            (reflected.clone(), reflected_score)
        } else {
            (simplex[worst].clone(), scores[worst])
        };
        let contracted: Vec<f64> = centroid
            .iter()
            .zip(anchor.iter())
            .map(|(&c, &x)| c + CONTRACT * (x - c))
            .collect();
        let contracted = clamp(&contracted);
        let contracted_score = objective(&contracted);

        if contracted_score < anchor_score {
            simplex[worst] = contracted;
            scores[worst] = contracted_score;
            continue;
        }

        // Shrink everything towards the best vertex.
        let anchor_vertex = simplex[best].clone();
        for i in 0..=dim {
            if i == best {
                continue;
            }
            for j in 0..dim {
                simplex[i][j] = anchor_vertex[j] + SHRINK * (simplex[i][j] - anchor_vertex[j]);
            }
            simplex[i] = clamp(&simplex[i]);
            scores[i] = objective(&simplex[i]);
        }
    }

    let best = scores
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0);

    SimplexOutcome {
        point: simplex[best].clone(),
        value: scores[best],
        iterations,
        converged,
    }
}
