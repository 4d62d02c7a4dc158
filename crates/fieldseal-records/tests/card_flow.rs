use fieldseal_core::cards::{CardNumber, CardRepository, CreditCard};
use fieldseal_records::SealedCardRepo;
use fieldseal_storage::{
    field_cipher::{EnvelopeFormat, FieldCipher},
    file_store::FileStore,
    key_provider::{KeyProvider, StaticKeyProvider},
};

const SAMPLE_KEY_B64: &str = "MTMyNDE1MTUxMjQxMjQxNA=="; // "1324151512412414"

fn sample_card() -> CreditCard {
    CreditCard {
        id: 1,
        card_number: "4731324241234123".into(),
        expiration_date: "12/2028".into(),
        owner_name: "Saif Eddine".into(),
    }
}

async fn cipher(format: EnvelopeFormat) -> FieldCipher {
    let provider = StaticKeyProvider::from_base64("test", SAMPLE_KEY_B64).expect("key");
    let material = provider.get_or_create().await.expect("material");
    FieldCipher::with_format(material.key, format)
}

#[tokio::test]
async fn card_survives_file_store_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");

    {
        let store = FileStore::connect(dir.path(), "myCluster").expect("connect");
        let repo = SealedCardRepo::connect(&store, cipher(EnvelopeFormat::Legacy).await)
            .await
            .expect("repo");
        repo.save(&sample_card()).await.expect("save");
    }

    // No plaintext card number anywhere on disk.
    for entry in std::fs::read_dir(dir.path()).expect("read dir") {
        let contents = std::fs::read_to_string(entry.expect("entry").path()).expect("read");
        assert!(contents.contains("Saif Eddine"));
        assert!(!contents.contains("4731324241234123"));
    }

    let store = FileStore::connect(dir.path(), "myCluster").expect("reconnect");
    let repo = SealedCardRepo::connect(&store, cipher(EnvelopeFormat::Legacy).await)
        .await
        .expect("repo");
    let cards = repo.list().await.expect("list");

    assert_eq!(cards.len(), 1);
    assert_eq!(
        cards[0].card_number,
        CardNumber::Revealed("4731324241234123".into())
    );
    assert_eq!(cards[0].expiration_date, "12/2028");
}

#[tokio::test]
async fn reader_with_other_format_sees_unreadable_numbers() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileStore::connect(dir.path(), "myCluster").expect("connect");

    let writer = SealedCardRepo::connect(&store, cipher(EnvelopeFormat::Tagged).await)
        .await
        .expect("writer");
    writer.save(&sample_card()).await.expect("save");

    let tagged_reader = SealedCardRepo::connect(&store, cipher(EnvelopeFormat::Tagged).await)
        .await
        .expect("reader");
    let cards = tagged_reader.list().await.expect("list");
    assert_eq!(cards[0].card_number.revealed(), Some("4731324241234123"));

    let legacy_reader = SealedCardRepo::connect(&store, cipher(EnvelopeFormat::Legacy).await)
        .await
        .expect("reader");
    let cards = legacy_reader.list().await.expect("list still succeeds");
    assert_eq!(cards.len(), 1);
    assert_ne!(cards[0].card_number.revealed(), Some("4731324241234123"));
    assert_eq!(cards[0].owner_name, "Saif Eddine");
}

#[tokio::test]
async fn switching_to_tagged_keeps_legacy_cards_readable() {
    let dir = tempfile::tempdir().expect("tempdir");
    {
        let store = FileStore::connect(dir.path(), "myCluster").expect("connect");
        let repo = SealedCardRepo::connect(&store, cipher(EnvelopeFormat::Legacy).await)
            .await
            .expect("repo");
        repo.save(&sample_card()).await.expect("save legacy");
    }

    let store = FileStore::connect(dir.path(), "myCluster").expect("reconnect");
    let repo = SealedCardRepo::connect(&store, cipher(EnvelopeFormat::Tagged).await)
        .await
        .expect("repo");
    let mut second = sample_card();
    second.id = 2;
    second.card_number = "5500000000000004".into();
    repo.save(&second).await.expect("save tagged");

    let cards = repo.list().await.expect("list");
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0].card_number.revealed(), Some("4731324241234123"));
    assert_eq!(cards[1].card_number.revealed(), Some("5500000000000004"));
}
