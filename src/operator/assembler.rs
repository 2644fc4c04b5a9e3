//! Memoised assembly of declared operators
use crate::assembly::AssemblyOptions;
use crate::function::FunctionSpace;
use crate::operator::{BoundaryOperator, DiscreteOperator, OperatorKind};
use crate::types::Result;
use itertools::Itertools;
use log::debug;
use rayon::prelude::*;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

type Key = (OperatorKind, usize, usize, usize);

fn key(op: &BoundaryOperator) -> Key {
    (
        op.kind(),
        op.domain() as *const FunctionSpace as usize,
        op.range() as *const FunctionSpace as usize,
        op.dual() as *const FunctionSpace as usize,
    )
}

/// Assembles declared operators and memoises their weak forms.
///
/// Operators are identified by their kind and the addresses of their three spaces. The
/// lifetime ties the assembler to the spaces so that no address can be reused while it is
/// alive.
pub struct OperatorAssembler<'a> {
    options: AssemblyOptions,
    cache: HashMap<Key, Arc<DiscreteOperator>>,
    _spaces: PhantomData<&'a FunctionSpace<'a>>,
}

impl<'a> OperatorAssembler<'a> {
    /// Create an assembler
    pub fn new(options: AssemblyOptions) -> Self {
        Self {
            options,
            cache: HashMap::new(),
            _spaces: PhantomData,
        }
    }

    /// The assembly options
    pub fn options(&self) -> &AssemblyOptions {
        &self.options
    }

    /// Number of assembled operators held
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether no operator has been assembled yet
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Assemble the weak form of an operator, or return the memoised one.
    pub fn assemble(&mut self, op: &BoundaryOperator<'a>) -> Result<Arc<DiscreteOperator>> {
        let key = key(op);
        if let Some(discrete) = self.cache.get(&key) {
            debug!("Reusing assembled {:?} operator", op.kind());
            return Ok(discrete.clone());
        }
        let discrete = Arc::new(op.weak_form(&self.options)?);
        self.cache.insert(key, discrete.clone());
        Ok(discrete)
    }

    /// Assemble every operator that has not been assembled yet, in parallel.
    ///
    /// On error nothing is added to the memo.
    pub fn assemble_all(&mut self, ops: &[BoundaryOperator<'a>]) -> Result<()> {
        let missing = ops
            .iter()
            .filter(|op| !self.cache.contains_key(&key(op)))
            .unique_by(|op| key(op))
            .collect::<Vec<_>>();
        debug!(
            "Assembling {} of {} requested operators",
            missing.len(),
            ops.len()
        );
        let options = &self.options;
        let assembled = missing
            .par_iter()
            .map(|op| Ok((key(op), Arc::new(op.weak_form(options)?))))
            .collect::<Result<Vec<_>>>()?;
        self.cache.extend(assembled);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::element::Continuity;
    use crate::shapes::regular_sphere;
    use crate::solvers::LinearOperator;

    #[test]
    fn test_memo() {
        let grid = regular_sphere(0);
        let dp0 = FunctionSpace::new(&grid, 0, Continuity::Discontinuous).unwrap();
        let p1 = FunctionSpace::new(&grid, 1, Continuity::Continuous).unwrap();
        let mut assembler = OperatorAssembler::new(AssemblyOptions::default());
        let slp = BoundaryOperator::new(OperatorKind::SingleLayer, &dp0, &dp0, &dp0).unwrap();
        let id = BoundaryOperator::new(OperatorKind::Identity, &p1, &p1, &dp0).unwrap();
        let a = assembler.assemble(&slp).unwrap();
        let b = assembler.assemble(&slp).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(assembler.len(), 1);

        assembler.assemble_all(&[slp, id, id]).unwrap();
        assert_eq!(assembler.len(), 2);
        let mass = assembler.assemble(&id).unwrap();
        assert_eq!(mass.shape(), [dp0.local_size(), p1.local_size()]);
    }
}
