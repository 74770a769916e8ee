//! Produces the pipeline of validators used to validate one chain

use alloc::boxed::Box;
use alloc::collections::BTreeSet;
use alloc::vec::Vec;

use crate::validator::cert_validator::*;
use crate::validator::validators::*;
use crate::CertificateValidationContext;

/// A `ValidatorFactory` produces a fresh set of validators for each chain. Validators are stateful,
/// so a pipeline must never be reused for a second chain.
///
/// Any `Fn(&CertificateValidationContext, usize) -> Vec<Box<dyn CertificateValidator>>` closure is
/// a factory, which makes it easy to add or remove validators.
pub trait ValidatorFactory {
    /// `generate` returns the validators, in the order they are to run, for a chain with
    /// path_length walked certificates.
    fn generate(
        &self,
        ctx: &CertificateValidationContext,
        path_length: usize,
    ) -> Vec<Box<dyn CertificateValidator>>;
}

impl<F> ValidatorFactory for F
where
    F: Fn(&CertificateValidationContext, usize) -> Vec<Box<dyn CertificateValidator>>,
{
    fn generate(
        &self,
        ctx: &CertificateValidationContext,
        path_length: usize,
    ) -> Vec<Box<dyn CertificateValidator>> {
        self(ctx, path_length)
    }
}

/// Default validators in the order they run.
pub const DEFAULT_VALIDATORS: &[ValidatorKind] = &[
    ValidatorKind::NameChaining,
    ValidatorKind::TimeValidity,
    ValidatorKind::CertValidity,
    ValidatorKind::BasicConstraints,
    ValidatorKind::KeyUsage,
    ValidatorKind::KeyIdentifier,
    ValidatorKind::NameConstraints,
    ValidatorKind::Policy,
];

/// `Rfc5280ValidatorFactory` produces the default pipeline, optionally without some validators.
#[derive(Clone, Debug, Default)]
pub struct Rfc5280ValidatorFactory {
    skipped: BTreeSet<ValidatorKind>,
}

impl Rfc5280ValidatorFactory {
    /// Instantiates a factory that produces all of [`DEFAULT_VALIDATORS`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiates a factory that produces [`DEFAULT_VALIDATORS`] except those listed in skipped.
    pub fn without(skipped: &[ValidatorKind]) -> Self {
        Rfc5280ValidatorFactory {
            skipped: skipped.iter().copied().collect(),
        }
    }
}

/// Instantiates the default validator of the given kind, if there is one.
pub fn default_validator(
    kind: ValidatorKind,
    ctx: &CertificateValidationContext,
    path_length: usize,
) -> Option<Box<dyn CertificateValidator>> {
    let v: Box<dyn CertificateValidator> = match kind {
        ValidatorKind::NameChaining => Box::new(NameChainingValidator::new(ctx, path_length)),
        ValidatorKind::TimeValidity => Box::new(TimeValidityValidator::new(ctx, path_length)),
        ValidatorKind::CertValidity => Box::new(CertValidityValidator::new(ctx, path_length)),
        ValidatorKind::BasicConstraints => {
            Box::new(BasicConstraintsValidator::new(ctx, path_length))
        }
        ValidatorKind::KeyUsage => Box::new(KeyUsageValidator::new(ctx, path_length)),
        ValidatorKind::KeyIdentifier => Box::new(KeyIdentifierValidator::new(ctx, path_length)),
        ValidatorKind::NameConstraints => {
            Box::new(NameConstraintsValidator::new(ctx, path_length))
        }
        ValidatorKind::Policy => Box::new(PolicyValidator::new(ctx, path_length)),
        _ => return None,
    };
    Some(v)
}

impl ValidatorFactory for Rfc5280ValidatorFactory {
    fn generate(
        &self,
        ctx: &CertificateValidationContext,
        path_length: usize,
    ) -> Vec<Box<dyn CertificateValidator>> {
        DEFAULT_VALIDATORS
            .iter()
            .filter(|kind| !self.skipped.contains(*kind))
            .filter_map(|kind| default_validator(*kind, ctx, path_length))
            .collect()
    }
}

#[test]
fn without_drops_validators() {
    let ctx = CertificateValidationContext::default();
    let kinds: Vec<ValidatorKind> = Rfc5280ValidatorFactory::without(&[ValidatorKind::KeyIdentifier])
        .generate(&ctx, 2)
        .iter()
        .map(|v| v.kind())
        .collect();
    assert_eq!(DEFAULT_VALIDATORS.len() - 1, kinds.len());
    assert!(!kinds.contains(&ValidatorKind::KeyIdentifier));
    assert_eq!(ValidatorKind::NameChaining, kinds[0]);
}
