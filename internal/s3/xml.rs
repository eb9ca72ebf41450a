use crate::meta::models::{MultipartUpload, ObjectHead};

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

pub struct ListBucketArgs<'a> {
    pub bucket: &'a str,
    pub prefix: &'a str,
    pub delimiter: &'a str,
    pub contents: &'a [ObjectHead],
    pub common_prefixes: &'a [String],
    pub max_keys: i64,
    pub is_truncated: bool,
    pub next_token: Option<&'a str>,
}

pub fn list_bucket_result(args: &ListBucketArgs<'_>) -> String {
    let mut body = String::new();
    body.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
    body.push_str("<ListBucketResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">");
    body.push_str("<Name>");
    body.push_str(&xml_escape(args.bucket));
    body.push_str("</Name>");
    body.push_str("<Prefix>");
    body.push_str(&xml_escape(args.prefix));
    body.push_str("</Prefix>");
    if !args.delimiter.is_empty() {
        body.push_str("<Delimiter>");
        body.push_str(&xml_escape(args.delimiter));
        body.push_str("</Delimiter>");
    }
    body.push_str("<KeyCount>");
    body.push_str(&(args.contents.len() + args.common_prefixes.len()).to_string());
    body.push_str("</KeyCount>");
    body.push_str("<MaxKeys>");
    body.push_str(&args.max_keys.to_string());
    body.push_str("</MaxKeys>");
    body.push_str("<IsTruncated>");
    body.push_str(if args.is_truncated { "true" } else { "false" });
    body.push_str("</IsTruncated>");
    if let Some(token) = args.next_token {
        body.push_str("<NextContinuationToken>");
        body.push_str(&xml_escape(token));
        body.push_str("</NextContinuationToken>");
    }
    for head in args.contents {
        append_contents(&mut body, head);
    }
    for prefix in args.common_prefixes {
        body.push_str("<CommonPrefixes><Prefix>");
        body.push_str(&xml_escape(prefix));
        body.push_str("</Prefix></CommonPrefixes>");
    }
    body.push_str("</ListBucketResult>");
    body
}

fn append_contents(body: &mut String, head: &ObjectHead) {
    body.push_str("<Contents>");
    body.push_str("<Key>");
    body.push_str(&xml_escape(&head.key));
    body.push_str("</Key>");
    body.push_str("<LastModified>");
    body.push_str(&xml_escape(&head.last_modified));
    body.push_str("</LastModified>");
    body.push_str("<ETag>");
    body.push_str(&xml_escape(&format!("\"{}\"", head.etag)));
    body.push_str("</ETag>");
    body.push_str("<Size>");
    body.push_str(&head.size.to_string());
    body.push_str("</Size>");
    body.push_str("<StorageClass>STANDARD</StorageClass>");
    body.push_str("</Contents>");
}

pub struct ListUploadsArgs<'a> {
    pub bucket: &'a str,
    pub prefix: &'a str,
    pub uploads: &'a [MultipartUpload],
    pub max_uploads: i64,
    pub is_truncated: bool,
    pub next_key_marker: Option<&'a str>,
    pub next_upload_id_marker: Option<&'a str>,
}

pub fn list_multipart_uploads_result(args: &ListUploadsArgs<'_>) -> String {
    let mut body = String::new();
    body.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
    body.push_str(
        "<ListMultipartUploadsResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">",
    );
    body.push_str("<Bucket>");
    body.push_str(&xml_escape(args.bucket));
    body.push_str("</Bucket>");
    body.push_str("<Prefix>");
    body.push_str(&xml_escape(args.prefix));
    body.push_str("</Prefix>");
    body.push_str("<MaxUploads>");
    body.push_str(&args.max_uploads.to_string());
    body.push_str("</MaxUploads>");
    body.push_str("<IsTruncated>");
    body.push_str(if args.is_truncated { "true" } else { "false" });
    body.push_str("</IsTruncated>");
    if let Some(marker) = args.next_key_marker {
        body.push_str("<NextKeyMarker>");
        body.push_str(&xml_escape(marker));
        body.push_str("</NextKeyMarker>");
    }
    if let Some(marker) = args.next_upload_id_marker {
        body.push_str("<NextUploadIdMarker>");
        body.push_str(&xml_escape(marker));
        body.push_str("</NextUploadIdMarker>");
    }
    for upload in args.uploads {
        body.push_str("<Upload>");
        body.push_str("<Key>");
        body.push_str(&xml_escape(&upload.key));
        body.push_str("</Key>");
        body.push_str("<UploadId>");
        body.push_str(&xml_escape(&upload.upload_id));
        body.push_str("</UploadId>");
        body.push_str("<Initiated>");
        body.push_str(&xml_escape(&upload.created_at));
        body.push_str("</Initiated>");
        body.push_str("</Upload>");
    }
    body.push_str("</ListMultipartUploadsResult>");
    body
}

pub fn initiate_multipart_upload(bucket: &str, key: &str, upload_id: &str) -> String {
    format!(
        concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>",
            "<InitiateMultipartUploadResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">",
            "<Bucket>{}</Bucket><Key>{}</Key><UploadId>{}</UploadId>",
            "</InitiateMultipartUploadResult>"
        ),
        xml_escape(bucket),
        xml_escape(key),
        xml_escape(upload_id)
    )
}

pub fn complete_multipart_upload(bucket: &str, key: &str, etag: &str) -> String {
    format!(
        concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>",
            "<CompleteMultipartUploadResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">",
            "<Bucket>{}</Bucket><Key>{}</Key><ETag>{}</ETag>",
            "</CompleteMultipartUploadResult>"
        ),
        xml_escape(bucket),
        xml_escape(key),
        xml_escape(&format!("\"{}\"", etag))
    )
}

pub fn copy_object_result(etag: &str, last_modified: &str) -> String {
    format!(
        concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>",
            "<CopyObjectResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">",
            "<LastModified>{}</LastModified><ETag>{}</ETag>",
            "</CopyObjectResult>"
        ),
        xml_escape(last_modified),
        xml_escape(&format!("\"{}\"", etag))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::models::ObjectHead;

    fn head(key: &str, size: i64) -> ObjectHead {
        ObjectHead {
            bucket: "b".to_string(),
            key: key.to_string(),
            size,
            etag: "d41d8cd98f00b204e9800998ecf8427e".to_string(),
            last_modified: "2024-01-01T00:00:00.000Z".to_string(),
            content_type: "text/plain".to_string(),
            depth: 0,
            parent: String::new(),
        }
    }

    #[test]
    fn xml_escape_covers_reserved_characters() {
        assert_eq!(
            xml_escape("a&b<c>d\"e'f"),
            "a&amp;b&lt;c&gt;d&quot;e&apos;f"
        );
    }

    #[test]
    fn list_bucket_result_counts_contents_and_prefixes() {
        let contents = vec![head("root.txt", 4)];
        let prefixes = vec!["dir1/".to_string(), "dir2/".to_string()];
        let body = list_bucket_result(&ListBucketArgs {
            bucket: "b",
            prefix: "",
            delimiter: "/",
            contents: &contents,
            common_prefixes: &prefixes,
            max_keys: 1000,
            is_truncated: false,
            next_token: None,
        });
        assert!(body.contains("<Name>b</Name>"));
        assert!(body.contains("<KeyCount>3</KeyCount>"));
        assert!(body.contains("<Delimiter>/</Delimiter>"));
        assert!(body.contains("<Key>root.txt</Key>"));
        assert!(body.contains("<ETag>&quot;d41d8cd98f00b204e9800998ecf8427e&quot;</ETag>"));
        assert!(body.contains("<StorageClass>STANDARD</StorageClass>"));
        assert!(body.contains("<CommonPrefixes><Prefix>dir1/</Prefix></CommonPrefixes>"));
        assert!(!body.contains("NextContinuationToken"));
    }

    #[test]
    fn list_bucket_result_emits_token_only_when_truncated() {
        let contents = vec![head("a", 1)];
        let body = list_bucket_result(&ListBucketArgs {
            bucket: "b",
            prefix: "",
            delimiter: "",
            contents: &contents,
            common_prefixes: &[],
            max_keys: 1,
            is_truncated: true,
            next_token: Some("a"),
        });
        assert!(body.contains("<IsTruncated>true</IsTruncated>"));
        assert!(body.contains("<NextContinuationToken>a</NextContinuationToken>"));
        assert!(!body.contains("<Delimiter>"));
    }

    #[test]
    fn list_bucket_result_keeps_raw_key_bytes() {
        let contents = vec![head("dir 1/file %20&.txt", 1)];
        let body = list_bucket_result(&ListBucketArgs {
            bucket: "b",
            prefix: "",
            delimiter: "",
            contents: &contents,
            common_prefixes: &[],
            max_keys: 1000,
            is_truncated: false,
            next_token: None,
        });
        assert!(body.contains("<Key>dir 1/file %20&amp;.txt</Key>"));
    }

    #[test]
    fn initiate_and_complete_results_quote_fields() {
        let initiate = initiate_multipart_upload("b", "m.txt", "upload-1");
        assert!(initiate.contains("<UploadId>upload-1</UploadId>"));
        let complete = complete_multipart_upload("b", "m.txt", "abcdef-2");
        assert!(complete.contains("<ETag>&quot;abcdef-2&quot;</ETag>"));
    }

    #[test]
    fn copy_object_result_contains_timestamp_and_etag() {
        let body = copy_object_result("cafebabe", "2024-01-01T00:00:00.000Z");
        assert!(body.contains("<LastModified>2024-01-01T00:00:00.000Z</LastModified>"));
        assert!(body.contains("<ETag>&quot;cafebabe&quot;</ETag>"));
    }

    #[test]
    fn list_uploads_result_renders_markers_when_truncated() {
        let uploads = vec![MultipartUpload {
            upload_id: "u1".to_string(),
            bucket: "b".to_string(),
            key: "k".to_string(),
            created_at: "2024-01-01T00:00:00.000Z".to_string(),
            content_type: String::new(),
        }];
        let body = list_multipart_uploads_result(&ListUploadsArgs {
            bucket: "b",
            prefix: "",
            uploads: &uploads,
            max_uploads: 1,
            is_truncated: true,
            next_key_marker: Some("k"),
            next_upload_id_marker: Some("u1"),
        });
        assert!(body.contains("<NextKeyMarker>k</NextKeyMarker>"));
        assert!(body.contains("<NextUploadIdMarker>u1</NextUploadIdMarker>"));
        assert!(body.contains("<Upload><Key>k</Key><UploadId>u1</UploadId>"));
    }
}
