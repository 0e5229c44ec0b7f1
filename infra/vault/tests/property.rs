use proptest::prelude::*;
use sbox_vault::prelude::*;

fn block_on<F: std::future::Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime")
        .block_on(fut)
}

proptest! {
    #[test]
    fn roundtrip_arbitrary_bytes(
        data in proptest::collection::vec(any::<u8>(), 0..2048),
        compress in any::<bool>(),
    ) {
        let key = SymmetricKey::generate().unwrap();
        let crypto = AeadCrypto::<ChaCha>::new().compression(compress);

        let opened = block_on(async {
            let sealed = crypto.encrypt(&data, &key, b"ctx").await.unwrap();
            crypto.decrypt(&sealed, &key, b"ctx").await.unwrap()
        });
        prop_assert_eq!(data, opened);
    }

    #[test]
    fn base64_text_form_is_stable(data in proptest::collection::vec(any::<u8>(), 0..256)) {
        let key = SymmetricKey::generate().unwrap();
        let sealed = block_on(AeadCrypto::<Aes>::new().encrypt(&data, &key, b"ctx")).unwrap();

        let parsed: EncString = sealed.to_string().parse().unwrap();
        prop_assert_eq!(parsed, sealed);
    }

    #[test]
    fn domain_keys_are_independent(tag_a in "[a-z_]{1,16}", tag_b in "[a-z_]{1,16}") {
        prop_assume!(tag_a != tag_b);
        let keys = KeyMaterial::builder().derived("secret", "salt").unwrap().build().unwrap();

        let a = keys.domain_key(&tag_a).unwrap();
        let b = keys.domain_key(&tag_b).unwrap();
        prop_assert_ne!(a.as_bytes(), b.as_bytes());
    }
}
