use poem_openapi::Object;

/// Fields of an embed composed from scratch. Text fields may reference
/// custom emojis as `:name:`.
#[derive(Object, Debug)]
pub struct ComposeBlastRequestDto {
    #[oai(validator(min_length = 1, max_length = 256))]
    pub title: String,
    #[oai(validator(min_length = 1, max_length = 4096))]
    pub description: String,
    /// Hex color such as `#5865F2`. Invalid values fall back to black.
    pub color: String,
    #[oai(validator(max_length = 2048))]
    pub footer: String,
    #[oai(validator(min_length = 1, max_length = 256))]
    pub field1_name: String,
    #[oai(validator(min_length = 1, max_length = 1024))]
    pub field1_value: String,
    #[oai(validator(max_length = 256))]
    pub field2_name: Option<String>,
    #[oai(validator(max_length = 1024))]
    pub field2_value: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Object, Debug)]
pub struct CopyBlastRequestDto {
    /// Message permalink or bare message id.
    #[oai(validator(min_length = 1))]
    pub message_link_or_id: String,
    /// Required when `message_link_or_id` is a bare id.
    pub channel_id: Option<String>,
}
