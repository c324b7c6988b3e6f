//! The [`Evaluator`] trait defines the blackbox being optimized.
//!
//! For simple functions, pass a closure straight to
//! [`optimize`](crate::optimize):
//!
//! ```no_run
//! use mads_driver::{optimize, Error};
//!
//! let result = optimize(
//!     &|x: &[f64]| Ok::<_, Error>(vec![x.iter().map(|v| v * v).sum()]),
//!     None,
//!     &[-5.0, -5.0],
//!     &[5.0, 5.0],
//!     &["CACHE_FILE sphere_cache.jsonl", "MAX_BB_EVAL 50"],
//! )?;
//! # Ok::<(), Error>(())
//! ```
//!
//! Implement the trait on a struct to override [`eval_block`] — for
//! instance to fan the batch out to worker threads. Per-point results must
//! all be collected before the driver's single observe call; the default
//! implementation simply evaluates sequentially.
//!
//! [`eval_block`]: Evaluator::eval_block

/// A caller-supplied blackbox mapping a candidate point to its outputs.
///
/// The output vector carries the objective value first, followed by any
/// constraint values. Returning `Err` marks that single point as a failed,
/// infeasible evaluation; the rest of the batch proceeds.
pub trait Evaluator {
    /// The error type returned by a failed evaluation.
    type Error: ToString + 'static;

    /// Evaluate one candidate point.
    ///
    /// # Errors
    ///
    /// Any error whose type implements `ToString`. A failure affects only
    /// this point.
    fn eval(&self, point: &[f64]) -> core::result::Result<Vec<f64>, Self::Error>;

    /// Evaluate a whole suggested batch, one outcome per point.
    ///
    /// The default implementation evaluates points one at a time.
    /// Batch-internal parallelism (threads, processes, async tasks) is fair
    /// game in overrides, as long as every point's outcome is present in
    /// the returned vector.
    fn eval_block(
        &self,
        points: &[Vec<f64>],
    ) -> Vec<core::result::Result<Vec<f64>, Self::Error>> {
        points.iter().map(|point| self.eval(point)).collect()
    }
}

impl<F, E> Evaluator for F
where
    F: Fn(&[f64]) -> core::result::Result<Vec<f64>, E>,
    E: ToString + 'static,
{
    type Error = E;

    fn eval(&self, point: &[f64]) -> core::result::Result<Vec<f64>, E> {
        self(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_is_an_evaluator() {
        let sum = |x: &[f64]| Ok::<_, &str>(vec![x.iter().sum()]);
        assert_eq!(sum.eval(&[1.0, 2.0, 3.0]).unwrap(), vec![6.0]);
    }

    #[test]
    fn default_block_form_keeps_order_and_failures() {
        let eval = |x: &[f64]| {
            if x[0] < 0.0 {
                Err("negative")
            } else {
                Ok(vec![x[0]])
            }
        };
        let outcomes = eval.eval_block(&[vec![1.0], vec![-1.0], vec![2.0]]);
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_ok());
        assert!(outcomes[1].is_err());
        assert_eq!(outcomes[2].as_ref().unwrap(), &vec![2.0]);
    }
}
