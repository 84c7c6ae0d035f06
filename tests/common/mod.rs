use lopdf::{Document, Object};

/// Build an unencrypted document with `pages` single-line text pages.
pub fn sample_document(pages: usize) -> Document {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let font_id = doc.new_object_id();
    let resources_id = doc.new_object_id();

    let catalog_dict = lopdf::dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id)
    };
    let catalog_id = doc.add_object(catalog_dict);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let font_dict = lopdf::dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica"
    };
    doc.objects.insert(font_id, Object::Dictionary(font_dict));

    let resources_dict = lopdf::dictionary! {
        "Font" => lopdf::dictionary! {
            "F1" => Object::Reference(font_id)
        }
    };
    doc.objects
        .insert(resources_id, Object::Dictionary(resources_dict));

    let mut kids = Vec::new();
    for index in 0..pages {
        let page_id = doc.new_object_id();
        let content_id = doc.new_object_id();

        let content = format!(
            "BT\n/F1 12 Tf\n100 700 Td\n(Page {} body) Tj\nET\n",
            index + 1
        );
        let content_stream = lopdf::Stream::new(lopdf::dictionary! {}, content.into_bytes());
        doc.objects.insert(content_id, Object::Stream(content_stream));

        let page_dict = lopdf::dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792)
            ],
            "Resources" => Object::Reference(resources_id),
            "Contents" => Object::Reference(content_id)
        };
        doc.objects.insert(page_id, Object::Dictionary(page_dict));
        kids.push(Object::Reference(page_id));
    }

    let pages_dict = lopdf::dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => pages as i64
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    doc
}

/// Protect `doc` with the given user/owner passwords (RC4-128).
pub fn encrypt_document(doc: &mut Document, user_password: &str, owner_password: &str) {
    // An ID in the trailer is required before encrypting
    let id1 = vec![1u8, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16];
    let id2 = vec![16u8, 15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1];
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(id1, lopdf::StringFormat::Literal),
            Object::String(id2, lopdf::StringFormat::Literal),
        ]),
    );

    let encryption_state = {
        let encryption_version = lopdf::EncryptionVersion::V2 {
            document: &*doc,
            owner_password,
            user_password,
            key_length: 128,
            permissions: lopdf::Permissions::all(),
        };
        lopdf::EncryptionState::try_from(encryption_version).expect("build encryption state")
    };
    doc.encrypt(&encryption_state).expect("encrypt document");
}

/// Serialize `doc` into a byte buffer.
pub fn document_bytes(doc: &mut Document) -> Vec<u8> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("serialize document");
    buffer
}
