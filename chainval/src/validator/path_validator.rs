//! Runs a pipeline of validators over a certificate chain

use alloc::borrow::Cow;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use const_oid::db::rfc5912::ID_CE_AUTHORITY_KEY_IDENTIFIER;
use log::{debug, info};
use x509_cert::name::Name;

use crate::util::error::*;
use crate::util::pdv_utilities::{compare_names, log_error_for_name, name_to_string};
use crate::validator::cert_validator::*;
use crate::validator::pdv_extension::*;
use crate::validator::validator_factory::*;
use crate::{
    CertificateChain, CertificateValidationContext, CertificateValidationResult, PDVCertificate,
    PDVTrustAnchorChoice,
};

/// `ChainValidationEngine` validates certificate chains using validators produced by a
/// [`ValidatorFactory`].
///
/// For each chain, the engine:
/// - resolves the trust anchor the chain terminates at,
/// - asks the factory for a fresh pipeline of validators,
/// - gives each validator a look at the trust anchor,
/// - walks the chain from the trust anchor to the leaf, running every validator on every
///   certificate and recording every error without stopping,
/// - reports critical extensions that no validator claimed.
///
/// Certificate trust anchors are walked as cert index 0. TrustAnchorInfo anchors are not walked.
#[derive(Clone, Debug, Default)]
pub struct ChainValidationEngine<F = Rfc5280ValidatorFactory> {
    factory: F,
}

impl ChainValidationEngine<Rfc5280ValidatorFactory> {
    /// Instantiates an engine that uses the default RFC 5280 pipeline.
    pub fn new() -> Self {
        ChainValidationEngine {
            factory: Rfc5280ValidatorFactory::new(),
        }
    }
}

/// Outcome of trust anchor resolution.
struct ResolvedAnchor<'a> {
    anchor: &'a PDVTrustAnchorChoice,
    /// certificate to prepend to the walk, when the anchor is a certificate not already in the chain
    prepend: Option<PDVCertificate>,
    /// true when the anchor is already the root-most element of the chain
    included: bool,
}

/// Returns the keyIdentifier field of the AuthorityKeyIdentifier extension in cert, if present.
fn authority_key_id(cert: &PDVCertificate) -> Option<&[u8]> {
    match cert.get_extension(&ID_CE_AUTHORITY_KEY_IDENTIFIER) {
        Ok(Some(PDVExtension::AuthorityKeyIdentifier(aki))) => {
            aki.key_identifier.as_ref().map(|kid| kid.as_bytes())
        }
        _ => None,
    }
}

/// `resolve_trust_anchor` finds the trust anchor that terminates chain.
fn resolve_trust_anchor<'a>(
    root: &PDVCertificate,
    ctx: &'a CertificateValidationContext,
) -> Result<ResolvedAnchor<'a>> {
    if let Some(anchor) = ctx
        .trust_anchors
        .iter()
        .find(|ta| ta.certificate() == Some(&root.decoded_cert))
    {
        if !ctx.allow_included_trust_anchor {
            return Err(Error::CertificateChain(
                "Trust anchor must not be included in the certificate chain.".to_string(),
            ));
        }
        return Ok(ResolvedAnchor {
            anchor,
            prepend: None,
            included: true,
        });
    }

    let issuer = &root.decoded_cert.tbs_certificate.issuer;
    let aki = authority_key_id(root);
    for anchor in &ctx.trust_anchors {
        let name_matches = match anchor.name() {
            Ok(name) => compare_names(name, issuer),
            Err(_) => false,
        };
        if !name_matches {
            continue;
        }
        if let (Some(aki), Some(skid)) = (aki, anchor.key_identifier()) {
            if aki != skid {
                debug!(
                    "Skipping trust anchor {} due to key identifier mismatch",
                    name_to_string(issuer)
                );
                continue;
            }
        }
        let prepend = match anchor.certificate() {
            Some(cert) => Some(PDVCertificate::try_from(cert.clone())?),
            None => None,
        };
        return Ok(ResolvedAnchor {
            anchor,
            prepend,
            included: false,
        });
    }

    Err(Error::CertificateChain(
        "No trust anchor found for certificate chain.".to_string(),
    ))
}

/// Records a failure and logs it against the name of the certificate it pertains to.
fn record(
    result: &mut CertificateValidationResult,
    validator: ValidatorKind,
    cert_index: usize,
    name: &Name,
    error: Error,
) {
    log_error_for_name(name, &format!("{}: {}", validator, error));
    result.add_failure(validator, cert_index, error);
}

impl<F: ValidatorFactory> ChainValidationEngine<F> {
    /// Instantiates an engine that uses validators produced by factory.
    pub fn with_factory(factory: F) -> Self {
        ChainValidationEngine { factory }
    }

    /// `validate` validates chain using the trust anchors and settings in ctx. The result lists every
    /// failure observed; the chain is valid if and only if the list is empty.
    pub fn validate(
        &self,
        chain: &CertificateChain,
        ctx: &CertificateValidationContext,
    ) -> CertificateValidationResult {
        let mut result = CertificateValidationResult::new();
        let root = match chain.root_most() {
            Some(root) => root,
            None => {
                result.add_failure(
                    ValidatorKind::TrustAnchor,
                    0,
                    Error::CertificateChain("Certificate chain is empty.".to_string()),
                );
                return result;
            }
        };
        debug!(
            "Validating chain of {} certificate(s) issued by {}",
            chain.len(),
            name_to_string(&root.decoded_cert.tbs_certificate.issuer)
        );

        let resolved = match resolve_trust_anchor(root, ctx) {
            Ok(resolved) => Some(resolved),
            Err(e) => {
                record(
                    &mut result,
                    ValidatorKind::TrustAnchor,
                    0,
                    &root.decoded_cert.tbs_certificate.issuer,
                    e,
                );
                None
            }
        };

        let mut walk: Vec<Cow<'_, PDVCertificate>> = Vec::with_capacity(chain.len() + 1);
        if let Some(ta_cert) = resolved.as_ref().and_then(|r| r.prepend.clone()) {
            walk.push(Cow::Owned(ta_cert));
        }
        walk.extend(chain.iter_anchor_to_leaf().map(Cow::Borrowed));

        let mut validators = self.factory.generate(ctx, walk.len());

        if let Some(resolved) = &resolved {
            let walked = resolved.included || resolved.prepend.is_some();
            let child_index = usize::from(walked);
            let link = TrustAnchorLink {
                anchor: resolved.anchor,
                walked,
                child: walk.get(child_index).map(|c| c.as_ref()),
                child_index,
            };
            let ta_name = resolved
                .anchor
                .name()
                .unwrap_or(&root.decoded_cert.tbs_certificate.issuer);
            for v in validators.iter_mut() {
                if let Err(e) = v.check_trust_anchor(&link) {
                    record(&mut result, v.kind(), child_index, ta_name, e);
                }
            }
        }

        for (index, cert) in walk.iter().enumerate() {
            let subject = &cert.decoded_cert.tbs_certificate.subject;
            let mut unclaimed = cert.critical_extensions();
            for v in validators.iter_mut() {
                if let Err(e) = v.check(cert, &mut unclaimed) {
                    record(&mut result, v.kind(), index, subject, e);
                }
            }
            if !unclaimed.is_empty() {
                let oids: Vec<String> = unclaimed.iter().map(|oid| oid.to_string()).collect();
                record(
                    &mut result,
                    ValidatorKind::CriticalExtensions,
                    index,
                    subject,
                    Error::UnrecognizedCriticalExtension(format!(
                        "Unrecognized critical extension(s) at cert index {}: {}.",
                        index,
                        oids.join(", ")
                    )),
                );
            }
        }

        if result.is_valid() {
            if let Some(leaf) = chain.leaf() {
                info!(
                    "Successfully validated chain for {}",
                    name_to_string(&leaf.decoded_cert.tbs_certificate.subject)
                );
            }
        }
        result
    }
}

/// `validate_chain` validates chain using the default RFC 5280 pipeline.
pub fn validate_chain(
    chain: &CertificateChain,
    ctx: &CertificateValidationContext,
) -> CertificateValidationResult {
    ChainValidationEngine::new().validate(chain, ctx)
}
