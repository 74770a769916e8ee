mod common;

use chainval::*;
use common::*;
use const_oid::db::rfc5280::{ANY_POLICY, ID_KP_CLIENT_AUTH, ID_KP_SERVER_AUTH};
use const_oid::db::rfc5912::*;
use const_oid::ObjectIdentifier;
use hex_literal::hex;
use x509_cert::ext::pkix::certpolicy::PolicyInformation;
use x509_cert::ext::pkix::{
    BasicConstraints, CertificatePolicies, ExtendedKeyUsage, KeyUsages, PolicyConstraints,
};
use x509_cert::name::RdnSequence;

fn run(ctx: &CertificateValidationContext, certs: Vec<CertBuilder>) -> CertificateValidationResult {
    validate_chain(&chain(certs), ctx)
}

//-----------------------------------------------------------------------------
// BasicConstraintsValidator
//-----------------------------------------------------------------------------
#[test]
fn basic_constraints_missing() {
    let (root, ica, leaf) = three_tier();
    let ctx = context(vec![root.build()]);
    let result = run(&ctx, vec![leaf, ica.without(ID_CE_BASIC_CONSTRAINTS)]);
    assert_single_failure(
        &result,
        ValidatorKind::BasicConstraints,
        1,
        "Missing basicConstraints extension at cert index 1.",
    );
}

#[test]
fn basic_constraints_not_critical() {
    let (root, ica, leaf) = three_tier();
    let ctx = context(vec![root.build()]);
    let ica = ica.extension(
        ID_CE_BASIC_CONSTRAINTS,
        false,
        &BasicConstraints {
            ca: true,
            path_len_constraint: None,
        },
    );
    let result = run(&ctx, vec![leaf, ica]);
    assert_single_failure(
        &result,
        ValidatorKind::BasicConstraints,
        1,
        "basicConstraints extension must be critical at cert index 1.",
    );
}

#[test]
fn basic_constraints_ca_flag() {
    let (root, ica, leaf) = three_tier();
    let ctx = context(vec![root.build()]);
    let result = run(&ctx, vec![leaf, ica.basic_constraints(false, None)]);
    assert_single_failure(
        &result,
        ValidatorKind::BasicConstraints,
        1,
        "Missing CA flag at cert index 1.",
    );
}

#[test]
fn leaf_needs_no_basic_constraints() {
    let (root, ica, leaf) = three_tier();
    let ctx = context(vec![root.build()]);
    assert!(run(&ctx, vec![leaf.clone().basic_constraints(false, None), ica.clone()]).is_valid());
    assert!(run(&ctx, vec![leaf.without(ID_CE_BASIC_CONSTRAINTS), ica]).is_valid());
}

#[test]
fn path_length_constraint() {
    let root = CertBuilder::root(ROOT, 1);
    let ica = CertBuilder::ca(ROOT, ICA, 2, 1).basic_constraints(true, Some(0));
    let ica2 = CertBuilder::ca(ICA, ICA2, 4, 2);
    let leaf = CertBuilder::leaf(ICA2, LEAF, 3, 4);
    let ctx = context(vec![root.build()]);

    let result = run(&ctx, vec![leaf.clone(), ica2, ica.clone()]);
    assert_single_failure(
        &result,
        ValidatorKind::BasicConstraints,
        2,
        "pathLenConstraint violated at cert index 2.",
    );

    // pathLenConstraint of 0 still permits issuing end entity certificates
    let leaf = CertBuilder::leaf(ICA, LEAF, 3, 2);
    assert!(run(&ctx, vec![leaf, ica]).is_valid());
}

#[test]
fn self_issued_certificates_do_not_count_toward_path_length() {
    let root = CertBuilder::root(ROOT, 1);
    let ica = CertBuilder::ca(ROOT, ICA, 2, 1).basic_constraints(true, Some(0));
    // key rollover certificate: same name, new key
    let rollover = CertBuilder::ca(ICA, ICA, 4, 2);
    let leaf = CertBuilder::leaf(ICA, LEAF, 3, 4);
    let ctx = context(vec![root.build()]);
    let result = run(&ctx, vec![leaf, rollover, ica]);
    assert!(result.is_valid(), "{:?}", messages(&result));
}

//-----------------------------------------------------------------------------
// KeyUsageValidator
//-----------------------------------------------------------------------------
#[test]
fn key_usage_missing() {
    let (root, ica, leaf) = three_tier();
    let ctx = context(vec![root.build()]);
    let result = run(&ctx, vec![leaf, ica.without(ID_CE_KEY_USAGE)]);
    assert_single_failure(
        &result,
        ValidatorKind::KeyUsage,
        1,
        "Missing KeyUsage extension at cert index 1.",
    );
}

#[test]
fn key_usage_bits() {
    let (root, ica, leaf) = three_tier();
    let ctx = context(vec![root.build()]);

    let result = run(
        &ctx,
        vec![leaf.clone(), ica.clone().key_usage(KeyUsages::KeyCertSign.into())],
    );
    assert_single_failure(
        &result,
        ValidatorKind::KeyUsage,
        1,
        "Missing KeyUsage CRLSign at cert index 1.",
    );

    let result = run(
        &ctx,
        vec![leaf, ica.key_usage(KeyUsages::DigitalSignature.into())],
    );
    assert_single_failure(
        &result,
        ValidatorKind::KeyUsage,
        1,
        "Missing KeyUsage KeyCertSign at cert index 1.",
    );
}

#[test]
fn leaf_extended_key_usage() {
    let (root, ica, leaf) = three_tier();
    let mut ctx = context(vec![root.build()]);
    ctx.expected_ekus.insert(ID_KP_SERVER_AUTH);

    // no extKeyUsage extension is acceptable
    assert!(run(&ctx, vec![leaf.clone(), ica.clone()]).is_valid());

    let server = leaf
        .clone()
        .extension(ID_CE_EXT_KEY_USAGE, false, &ExtendedKeyUsage(vec![ID_KP_SERVER_AUTH]));
    assert!(run(&ctx, vec![server, ica.clone()]).is_valid());

    let client = leaf.extension(
        ID_CE_EXT_KEY_USAGE,
        true,
        &ExtendedKeyUsage(vec![ID_KP_CLIENT_AUTH]),
    );
    let result = run(&ctx, vec![client, ica]);
    assert_single_failure(
        &result,
        ValidatorKind::KeyUsage,
        2,
        "Extended key usage violation at cert index 2.",
    );
}

//-----------------------------------------------------------------------------
// KeyIdentifierValidator
//-----------------------------------------------------------------------------
#[test]
fn subject_key_identifier_must_not_be_critical() {
    let (root, ica, leaf) = three_tier();
    let ctx = context(vec![root.build()]);
    let ica = ica.extension(
        ID_CE_SUBJECT_KEY_IDENTIFIER,
        true,
        &x509_cert::ext::pkix::SubjectKeyIdentifier(key_id(2)),
    );
    let result = run(&ctx, vec![leaf, ica]);
    assert_single_failure(
        &result,
        ValidatorKind::KeyIdentifier,
        1,
        "SubjectKeyIdentifier extension must not be critical in certificate at index 1.",
    );
}

#[test]
fn first_certificate_needs_authority_key_identifier() {
    let (root, ica, leaf) = three_tier();
    let ctx = context(vec![root.build()]);
    let result = run(&ctx, vec![leaf, ica.without(ID_CE_AUTHORITY_KEY_IDENTIFIER)]);
    assert_single_failure(
        &result,
        ValidatorKind::KeyIdentifier,
        1,
        "Missing AuthorityKeyIdentifier extension in certificate at index 1.",
    );
}

#[test]
fn trust_anchor_issued_by_another_ca_needs_authority_key_identifier() {
    // a trust anchor that is not self-issued
    let anchor = CertBuilder::ca("CN=Elsewhere,C=US", ROOT, 1, 5).without(ID_CE_AUTHORITY_KEY_IDENTIFIER);
    let (_, ica, leaf) = three_tier();
    let ctx = context(vec![anchor.build()]);
    let result = run(&ctx, vec![leaf, ica]);
    assert_single_failure(
        &result,
        ValidatorKind::KeyIdentifier,
        1,
        "Missing AuthorityKeyIdentifier extension in trust anchor.",
    );
}

//-----------------------------------------------------------------------------
// TimeValidityValidator and CertValidityValidator
//-----------------------------------------------------------------------------
const JAN_2025: u64 = 1_735_689_600;

#[test]
fn not_yet_valid() {
    let (root, ica, leaf) = three_tier();
    let ctx = context(vec![root.build()]);
    let result = run(&ctx, vec![leaf.validity(JAN_2025, JAN_2030), ica]);
    assert_eq!(1, result.validator_failures.len());
    let failure = &result.validator_failures[0];
    assert_eq!(ValidatorKind::TimeValidity, failure.validator);
    assert!(failure
        .error_message()
        .starts_with("Certificate at index 2 is not yet valid. Valid from 2025-01-01"));
}

#[test]
fn expired() {
    let (root, ica, leaf) = three_tier();
    let mut ctx = context(vec![root.build()]);
    let leaf = leaf.validity(JAN_2020, 1_600_000_000);
    let result = run(&ctx, vec![leaf.clone(), ica.clone()]);
    assert_eq!(1, result.validator_failures.len());
    assert!(result.validator_failures[0]
        .error_message()
        .starts_with("Certificate at index 2 has expired. Valid until 2020-09-13"));

    // disabled time of interest
    ctx.date = TimeOfInterest::disabled();
    assert!(run(&ctx, vec![leaf, ica]).is_valid());
}

#[test]
fn validity_period_order() {
    let (root, ica, leaf) = three_tier();
    let mut ctx = context(vec![root.build()]);
    ctx.date = TimeOfInterest::disabled();
    let result = run(&ctx, vec![leaf.validity(JAN_2030, JAN_2020), ica]);
    assert_single_failure(
        &result,
        ValidatorKind::CertValidity,
        2,
        "Certificate at index 2 has notBefore after notAfter.",
    );
    assert!(matches!(
        result.validator_failures[0].error,
        Error::Asn1Structural(_)
    ));
}

#[test]
fn serial_numbers() {
    let (root, ica, leaf) = three_tier();
    let ctx = context(vec![root.build()]);

    let result = run(&ctx, vec![leaf.clone().serial_der(&hex!("020100")), ica.clone()]);
    assert_single_failure(
        &result,
        ValidatorKind::CertValidity,
        2,
        "Certificate serial number at cert index 2 is zero.",
    );

    let result = run(
        &ctx,
        vec![leaf.clone().serial_der(&hex!("02028001")), ica.clone()],
    );
    assert_single_failure(
        &result,
        ValidatorKind::CertValidity,
        2,
        "Certificate serial number at cert index 2 is negative.",
    );

    let too_long = hex!("0215 010101010101010101010101010101010101010101");
    let result = run(&ctx, vec![leaf.clone().serial_der(&too_long), ica.clone()]);
    assert_single_failure(
        &result,
        ValidatorKind::CertValidity,
        2,
        "Certificate serial number at cert index 2 exceeds 20 octets.",
    );

    // twenty octets with a high bit set need a leading zero octet
    let twenty = hex!("0215 00 FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF");
    assert!(run(&ctx, vec![leaf.serial_der(&twenty), ica]).is_valid());
}

#[test]
fn empty_subject_requires_critical_san() {
    let (root, ica, leaf) = three_tier();
    let ctx = context(vec![root.build()]);
    let leaf = leaf.subject_name(RdnSequence(Vec::new()));

    let result = run(&ctx, vec![leaf.clone(), ica.clone()]);
    assert_single_failure(
        &result,
        ValidatorKind::CertValidity,
        2,
        "Certificate at index 2 has an empty subject but no critical SubjectAltName extension.",
    );

    let result = run(&ctx, vec![leaf.san(vec![dns("leaf.example.com")], true), ica]);
    assert!(result.is_valid(), "{:?}", messages(&result));
}

//-----------------------------------------------------------------------------
// NameChainingValidator
//-----------------------------------------------------------------------------
#[test]
fn issuer_must_match_subject_of_issuer() {
    let (root, ica, _) = three_tier();
    let ctx = context(vec![root.build()]);
    let leaf = CertBuilder::leaf("CN=Someone Else,O=Test,C=US", LEAF, 3, 2);
    let result = run(&ctx, vec![leaf, ica]);
    assert_single_failure(
        &result,
        ValidatorKind::NameChaining,
        2,
        "Issuer of certificate at index 2 does not match subject of its issuer.",
    );
}

#[test]
fn name_chaining_ignores_case() {
    let (root, ica, _) = three_tier();
    let ctx = context(vec![root.build()]);
    let leaf = CertBuilder::leaf("CN=test intermediate,O=TEST,C=US", LEAF, 3, 2);
    let result = run(&ctx, vec![leaf, ica]);
    assert!(result.is_valid(), "{:?}", messages(&result));
}

//-----------------------------------------------------------------------------
// PolicyValidator
//-----------------------------------------------------------------------------
fn policies(oids: &[ObjectIdentifier]) -> CertificatePolicies {
    CertificatePolicies(
        oids.iter()
            .map(|oid| PolicyInformation {
                policy_identifier: *oid,
                policy_qualifiers: None,
            })
            .collect(),
    )
}

const POLICY_A: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.2.1.48.1");
const POLICY_B: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.2.1.48.2");

#[test]
fn explicit_policy() {
    let (root, ica, leaf) = three_tier();
    let mut ctx = context(vec![root.build()]);
    ctx.explicit_policy_required = true;

    let result = run(&ctx, vec![leaf.clone(), ica.clone()]);
    assert_single_failure(
        &result,
        ValidatorKind::Policy,
        2,
        "No valid certificate policy at cert index 2.",
    );

    let ica = ica.extension(ID_CE_CERTIFICATE_POLICIES, false, &policies(&[ANY_POLICY]));
    let leaf = leaf.extension(ID_CE_CERTIFICATE_POLICIES, true, &policies(&[POLICY_A]));
    let result = run(&ctx, vec![leaf.clone(), ica.clone()]);
    assert!(result.is_valid(), "{:?}", messages(&result));

    ctx.initial_policies = [POLICY_B].into_iter().collect();
    let result = run(&ctx, vec![leaf, ica]);
    assert_eq!(
        Some("No valid certificate policy at cert index 2.".to_string()),
        result.error_message()
    );
}

#[test]
fn require_explicit_policy_from_intermediate() {
    let (root, ica, leaf) = three_tier();
    let ctx = context(vec![root.build()]);
    let ica = ica.extension(
        ID_CE_POLICY_CONSTRAINTS,
        true,
        &PolicyConstraints {
            require_explicit_policy: Some(0),
            inhibit_policy_mapping: None,
        },
    );
    let result = run(&ctx, vec![leaf, ica]);
    assert_single_failure(
        &result,
        ValidatorKind::Policy,
        2,
        "No valid certificate policy at cert index 2.",
    );
}

#[test]
fn inhibited_any_policy_is_not_a_wildcard() {
    let (root, ica, leaf) = three_tier();
    let mut ctx = context(vec![root.build()]);
    ctx.explicit_policy_required = true;
    ctx.any_policy_inhibited = true;
    let ica = ica.extension(ID_CE_CERTIFICATE_POLICIES, false, &policies(&[ANY_POLICY]));
    let leaf = leaf.extension(ID_CE_CERTIFICATE_POLICIES, false, &policies(&[POLICY_A]));
    let result = run(&ctx, vec![leaf, ica]);
    assert_eq!(1, result.failures_for(ValidatorKind::Policy).count());
}
