mod common;

use chainval::*;
use common::*;
use der::asn1::Null;

#[test]
fn valid_three_tier_chain() {
    let (root, ica, leaf) = three_tier();
    let ctx = context(vec![root.build()]);
    let result = validate_chain(&chain(vec![leaf, ica]), &ctx);
    assert!(result.is_valid(), "{:?}", messages(&result));
    assert_eq!(None, result.error_message());
}

#[test]
fn included_trust_anchor() {
    let (root, ica, leaf) = three_tier();
    let mut ctx = context(vec![root.clone().build()]);
    let c = chain(vec![leaf, ica, root]);

    let result = validate_chain(&c, &ctx);
    assert!(result.is_valid(), "{:?}", messages(&result));

    ctx.allow_included_trust_anchor = false;
    let result = validate_chain(&c, &ctx);
    assert_single_failure(
        &result,
        ValidatorKind::TrustAnchor,
        0,
        "Trust anchor must not be included in the certificate chain.",
    );
}

#[test]
fn no_trust_anchor() {
    let (_, ica, leaf) = three_tier();
    let ctx = context(vec![CertBuilder::root("CN=Other Root,O=Test,C=US", 9).build()]);
    let result = validate_chain(&chain(vec![leaf, ica]), &ctx);
    assert_single_failure(
        &result,
        ValidatorKind::TrustAnchor,
        0,
        "No trust anchor found for certificate chain.",
    );
}

#[test]
fn trust_anchor_key_identifier_must_match() {
    let (root, _, leaf) = three_tier();
    // same name as the trust anchor, different key
    let ica = CertBuilder::ca(ROOT, ICA, 2, 7);
    let ctx = context(vec![root.build()]);
    let result = validate_chain(&chain(vec![leaf, ica]), &ctx);
    assert_eq!(
        Some("No trust anchor found for certificate chain.".to_string()),
        result.error_message()
    );
}

#[test]
fn empty_chain() {
    let (root, _, _) = three_tier();
    let ctx = context(vec![root.build()]);
    let result = validate_chain(&CertificateChain::new(vec![]), &ctx);
    assert_single_failure(
        &result,
        ValidatorKind::TrustAnchor,
        0,
        "Certificate chain is empty.",
    );
}

#[test]
fn unrecognized_critical_extension() {
    let (root, ica, leaf) = three_tier();
    let oid = const_oid::ObjectIdentifier::new_unwrap("1.2.3.4.5");
    let leaf = leaf.extension(oid, true, &Null);
    let ctx = context(vec![root.build()]);
    let result = validate_chain(&chain(vec![leaf, ica]), &ctx);
    assert_single_failure(
        &result,
        ValidatorKind::CriticalExtensions,
        2,
        "Unrecognized critical extension(s) at cert index 2: 1.2.3.4.5.",
    );
}

#[test]
fn non_critical_unknown_extension_is_ignored() {
    let (root, ica, leaf) = three_tier();
    let oid = const_oid::ObjectIdentifier::new_unwrap("1.2.3.4.5");
    let leaf = leaf.extension(oid, false, &Null);
    let ctx = context(vec![root.build()]);
    assert!(validate_chain(&chain(vec![leaf, ica]), &ctx).is_valid());
}

#[test]
fn every_failure_is_reported() {
    let (root, ica, leaf) = three_tier();
    let ica = ica.basic_constraints(false, None).without(const_oid::db::rfc5912::ID_CE_KEY_USAGE);
    let ctx = context(vec![root.build()]);
    let result = validate_chain(&chain(vec![leaf, ica]), &ctx);
    assert_eq!(
        vec![
            "Missing CA flag at cert index 1.".to_string(),
            "Missing KeyUsage extension at cert index 1.".to_string(),
        ],
        messages(&result)
    );
    assert_eq!(1, result.failures_for(ValidatorKind::KeyUsage).count());
}

#[test]
fn results_are_deterministic() {
    let (root, ica, leaf) = three_tier();
    let ica = ica.basic_constraints(false, None);
    let leaf = leaf.validity(JAN_2020, JAN_2020 + 1);
    let ctx = context(vec![root.build()]);
    let c = chain(vec![leaf, ica]);
    let engine = ChainValidationEngine::new();
    let first = engine.validate(&c, &ctx);
    let second = engine.validate(&c, &ctx);
    assert_eq!(2, first.validator_failures.len());
    assert_eq!(first, second);
}

#[test]
fn factory_can_drop_validators() {
    let (root, ica, leaf) = three_tier();
    let ica = ica.without(const_oid::db::rfc5912::ID_CE_SUBJECT_KEY_IDENTIFIER);
    let ctx = context(vec![root.build()]);
    let c = chain(vec![leaf, ica]);

    let result = validate_chain(&c, &ctx);
    assert_single_failure(
        &result,
        ValidatorKind::KeyIdentifier,
        1,
        "Missing SubjectKeyIdentifier extension in certificate at index 1.",
    );

    let engine =
        ChainValidationEngine::with_factory(Rfc5280ValidatorFactory::without(&[ValidatorKind::KeyIdentifier]));
    assert!(engine.validate(&c, &ctx).is_valid());
}

#[test]
fn closure_factory() {
    let (root, ica, leaf) = three_tier();
    let ica = ica.without(const_oid::db::rfc5912::ID_CE_SUBJECT_KEY_IDENTIFIER);
    let ctx = context(vec![root.build()]);
    let c = chain(vec![leaf, ica]);

    // validators that claim the critical basicConstraints and keyUsage extensions are needed
    let factory = |ctx: &CertificateValidationContext,
                   path_length: usize|
     -> Vec<Box<dyn CertificateValidator>> {
        vec![
            Box::new(NameChainingValidator::new(ctx, path_length)),
            Box::new(BasicConstraintsValidator::new(ctx, path_length)),
            Box::new(KeyUsageValidator::new(ctx, path_length)),
        ]
    };
    let engine = ChainValidationEngine::with_factory(factory);
    assert!(engine.validate(&c, &ctx).is_valid());

    let engine = ChainValidationEngine::with_factory(
        |ctx: &CertificateValidationContext, path_length: usize| {
            let v: Vec<Box<dyn CertificateValidator>> =
                vec![Box::new(NameChainingValidator::new(ctx, path_length))];
            v
        },
    );
    let result = engine.validate(&c, &ctx);
    assert_eq!(
        3,
        result.failures_for(ValidatorKind::CriticalExtensions).count()
    );
}

#[test]
fn result_serializes_to_json() {
    let (root, ica, leaf) = three_tier();
    let ica = ica.basic_constraints(false, None);
    let ctx = context(vec![root.build()]);
    let result = validate_chain(&chain(vec![leaf, ica]), &ctx);
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(
        serde_json::json!({
            "valid": false,
            "validator_failures": [{
                "validator": "BasicConstraintsValidator",
                "cert_index": 1,
                "error": "Missing CA flag at cert index 1."
            }]
        }),
        json
    );
}
