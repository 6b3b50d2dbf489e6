use ndarray::Array1;
use std::collections::VecDeque;
use tracing::debug;

/// Hyperparameters for the L-BFGS optimizer
#[derive(Clone, Debug)]
pub struct LbfgsConfig {
    pub lr: f64,
    /// Maximal number of iterations per `step`
    pub max_iter: usize,
    /// Maximal number of closure evaluations per `step` (defaults to max_iter * 5 / 4)
    pub max_eval: Option<usize>,
    /// Termination tolerance on first order optimality
    pub tolerance_grad: f64,
    /// Termination tolerance on function value and parameter changes
    pub tolerance_change: f64,
    /// Number of curvature pairs kept
    pub history_size: usize,
}

impl Default for LbfgsConfig {
    fn default() -> Self {
        LbfgsConfig {
            lr: 0.8,
            max_iter: 20,
            max_eval: None,
            tolerance_grad: 1e-7,
            tolerance_change: 1e-9,
            history_size: 100,
        }
    }
}

impl LbfgsConfig {
    pub fn with_lr(mut self, lr: f64) -> Self {
        self.lr = lr;
        self
    }

    pub fn max_eval(&self) -> usize {
        self.max_eval.unwrap_or(self.max_iter * 5 / 4)
    }
}

/// Curvature pair (y = Δgrad, s = Δparams) with ρ = 1 / (y·s)
#[derive(Clone, Debug)]
struct CurvaturePair {
    y: Array1<f64>,
    s: Array1<f64>,
    rho: f64,
}

/// Limited-memory BFGS over a flat parameter vector.
///
/// Uses a fixed step length (no line search). The search direction, step
/// length and curvature history survive across calls to `step`, so repeated
/// steps keep refining the same Hessian approximation.
pub struct LBFGS {
    config: LbfgsConfig,
    direction: Option<Array1<f64>>,
    step_length: f64,
    history: VecDeque<CurvaturePair>,
    h_diag: f64,
    prev_flat_grad: Option<Array1<f64>>,
    prev_loss: Option<f64>,
    n_iter: usize,
    func_evals: usize,
}

impl LBFGS {
    pub fn new(config: LbfgsConfig) -> Self {
        LBFGS {
            config,
            direction: None,
            step_length: 0.0,
            history: VecDeque::new(),
            h_diag: 1.0,
            prev_flat_grad: None,
            prev_loss: None,
            n_iter: 0,
            func_evals: 0,
        }
    }

    pub fn config(&self) -> &LbfgsConfig {
        &self.config
    }

    /// Total iterations performed over the optimizer's lifetime
    pub fn iterations(&self) -> usize {
        self.n_iter
    }

    /// Total closure evaluations over the optimizer's lifetime
    pub fn function_evaluations(&self) -> usize {
        self.func_evals
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Performs one optimization step, re-evaluating the objective as needed.
    ///
    /// `closure` receives the current parameters and returns `(loss, gradient)`.
    /// `params` holds the updated parameters on return. Returns the loss of
    /// the first evaluation; the first closure error aborts the step.
    pub fn step<F, E>(&mut self, params: &mut Array1<f64>, mut closure: F) -> Result<f64, E>
    where
        F: FnMut(&Array1<f64>) -> Result<(f64, Array1<f64>), E>,
    {
        let lr = self.config.lr;
        let max_iter = self.config.max_iter;
        let max_eval = self.config.max_eval();
        let tolerance_grad = self.config.tolerance_grad;
        let tolerance_change = self.config.tolerance_change;

        let (orig_loss, mut flat_grad) = closure(params)?;
        let mut loss = orig_loss;
        let mut current_evals = 1;
        self.func_evals += 1;

        if max_abs(&flat_grad) <= tolerance_grad {
            debug!("L-BFGS: gradient already below tolerance");
            return Ok(orig_loss);
        }

        let mut n_iter = 0;
        while n_iter < max_iter {
            n_iter += 1;
            self.n_iter += 1;

            let d = if self.n_iter == 1 {
                self.history.clear();
                self.h_diag = 1.0;
                -&flat_grad
            } else {
                self.update_history(&flat_grad);
                self.two_loop_direction(&flat_grad)
            };

            self.prev_flat_grad = Some(flat_grad.clone());
            self.prev_loss = Some(loss);

            self.step_length = if self.n_iter == 1 {
                let l1 = flat_grad.mapv(f64::abs).sum();
                (1.0 / l1).min(1.0) * lr
            } else {
                lr
            };

            let gtd = flat_grad.dot(&d);
            if gtd > -tolerance_change {
                debug!(gtd, "L-BFGS: directional derivative below tolerance");
                self.direction = Some(d);
                break;
            }

            params.scaled_add(self.step_length, &d);

            let mut ls_func_evals = 0;
            let mut opt_cond = false;
            if n_iter != max_iter {
                let (new_loss, new_grad) = closure(params)?;
                loss = new_loss;
                flat_grad = new_grad;
                opt_cond = max_abs(&flat_grad) <= tolerance_grad;
                ls_func_evals = 1;
            }
            current_evals += ls_func_evals;
            self.func_evals += ls_func_evals;

            let step_change = max_abs(&d) * self.step_length.abs();
            self.direction = Some(d);

            if n_iter == max_iter {
                break;
            }
            if current_evals >= max_eval {
                debug!(current_evals, "L-BFGS: evaluation budget exhausted");
                break;
            }
            if opt_cond {
                debug!("L-BFGS: gradient below tolerance");
                break;
            }
            if step_change <= tolerance_change {
                debug!(step_change, "L-BFGS: parameter change below tolerance");
                break;
            }
            if let Some(prev_loss) = self.prev_loss {
                if (loss - prev_loss).abs() < tolerance_change {
                    debug!("L-BFGS: loss change below tolerance");
                    break;
                }
            }
        }

        Ok(orig_loss)
    }

    /// Records the curvature pair produced by the previous iteration
    fn update_history(&mut self, flat_grad: &Array1<f64>) {
        let (Some(prev_grad), Some(d)) = (self.prev_flat_grad.as_ref(), self.direction.as_ref()) else {
            return;
        };

        let y = flat_grad - prev_grad;
        let s = d * self.step_length;
        let ys = y.dot(&s);

        // Skip pairs that would break positive definiteness
        if ys > 1e-10 {
            self.h_diag = ys / y.dot(&y);
            if self.config.history_size > 0 {
                if self.history.len() == self.config.history_size {
                    self.history.pop_front();
                }
                self.history.push_back(CurvaturePair { y, s, rho: 1.0 / ys });
            }
        }
    }

    /// Approximates -H·g with the standard two-loop recursion
    fn two_loop_direction(&self, flat_grad: &Array1<f64>) -> Array1<f64> {
        let mut q = -flat_grad;
        let mut alphas = vec![0.0; self.history.len()];

        for (i, pair) in self.history.iter().enumerate().rev() {
            alphas[i] = pair.s.dot(&q) * pair.rho;
            q.scaled_add(-alphas[i], &pair.y);
        }

        let mut r = q * self.h_diag;
        for (pair, alpha) in self.history.iter().zip(alphas.iter()) {
            let beta = pair.y.dot(&r) * pair.rho;
            r.scaled_add(alpha - beta, &pair.s);
        }
        r
    }

    /// Clears all state accumulated by previous steps
    pub fn reset(&mut self) {
        self.direction = None;
        self.step_length = 0.0;
        self.history.clear();
        self.h_diag = 1.0;
        self.prev_flat_grad = None;
        self.prev_loss = None;
        self.n_iter = 0;
        self.func_evals = 0;
    }
}

fn max_abs(v: &Array1<f64>) -> f64 {
    v.iter().fold(0.0, |acc, x| acc.max(x.abs()))
}
