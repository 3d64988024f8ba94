use std::sync::Arc;

use async_stream::try_stream;
use chrono::{DateTime, Utc};
use futures::Stream;
use gsync::{Entry, RemoteId};
use tokio::io;

use crate::{oauth2::GetToken, PersistCache};

/// The remote side of the reconciliation, backed by the Drive v3 REST API
#[derive(Clone)]
pub struct GoogleDrive<A> {
    client: reqwest::Client,
    auth: Arc<A>,
    base_url: &'static str,
    upload_base_url: &'static str,
    user_agent: String,

    user: api::User,
    quota: api::Quota,
}

impl<A> GoogleDrive<A>
where
    A: GetToken,
{
    pub async fn new(auth: A, client: reqwest::Client) -> anyhow::Result<Self> {
        let user_agent = format!("gsynctl/{}", env!("CARGO_PKG_VERSION"));
        let mut drive = Self {
            auth: Arc::new(auth),
            client,
            base_url: "https://www.googleapis.com/drive/v3",
            upload_base_url: "https://www.googleapis.com/upload/drive/v3",
            user_agent,
            user: api::User::default(),
            quota: api::Quota::default(),
        };

        let about = drive.about_get().await?;
        drive.user = about.user;
        drive.quota = about.storage_quota;

        log::info!(
            "Access granted to Drive of {}{}",
            drive.user.display_name,
            drive
                .user
                .email_address
                .as_ref()
                .map(|em| format!(" <{em}>"))
                .unwrap_or_default(),
        );
        if let (&Some(usage), &Some(limit)) = (&drive.quota.usage, &drive.quota.limit) {
            use byte_unit::{Byte, UnitType};
            if let (Some(usage), Some(limit)) = (Byte::from_i64(usage), Byte::from_i64(limit)) {
                let usage = usage.get_appropriate_unit(UnitType::Binary);
                let limit = limit.get_appropriate_unit(UnitType::Binary);
                log::info!("Usage {usage:#.2} / {limit:#.3}");
            }
        }

        Ok(drive)
    }

    /// Checks that `id` designates a folder and returns its name
    pub async fn folder_name(&self, id: &RemoteId) -> gsync::Result<String> {
        let file = self
            .files_get(id, "id,name,mimeType")
            .await?
            .ok_or_else(|| gsync::Error::NotFound(format!("Drive folder {id}")))?;
        if file.mime_type.as_deref() != Some(FOLDER_MIMETYPE) {
            gsync::api_bail!("{id} is not a Drive folder");
        }
        Ok(file.name.unwrap_or_default())
    }
}

impl<A> super::id::DirEntries for GoogleDrive<A>
where
    A: GetToken,
{
    fn dir_entries(
        &self,
        folder_id: &RemoteId,
    ) -> impl Stream<Item = gsync::Result<Entry>> + Send {
        log::trace!("listing entries of folder {folder_id}");
        let q = format!("'{folder_id}' in parents and trashed = false");
        let mut next_page_token = None;

        try_stream! {
            loop {
                let file_list = self.files_list(q.clone(), next_page_token).await?;
                next_page_token = file_list.next_page_token;
                if let Some(files) = file_list.files {
                    for f in files {
                        if let Some(entry) = map_file(f)? {
                            yield entry;
                        }
                    }
                }
                if next_page_token.is_none() {
                    break;
                }
            }
        }
    }
}

impl<A> super::id::ModifiedTime for GoogleDrive<A>
where
    A: GetToken,
{
    async fn modified_time(&self, id: &RemoteId) -> gsync::Result<DateTime<Utc>> {
        let file = self
            .files_get(id, "modifiedTime")
            .await?
            .ok_or_else(|| gsync::Error::NotFound(format!("Drive file {id}")))?;
        file.modified_time
            .ok_or_else(|| gsync::api_error!("Expected to receive modifiedTime from Google for {id}"))
    }
}

impl<A> super::id::ReadFile for GoogleDrive<A>
where
    A: GetToken,
{
    async fn read_file(&self, id: &RemoteId) -> gsync::Result<impl io::AsyncRead + Send> {
        log::trace!("reading file {id}");
        self.files_get_media(id)
            .await?
            .ok_or_else(|| gsync::Error::NotFound(format!("Drive file {id}")))
    }
}

impl<A> super::id::MkDir for GoogleDrive<A>
where
    A: GetToken,
{
    async fn mkdir(&self, parent_id: &RemoteId, name: &str) -> gsync::Result<RemoteId> {
        log::trace!("creating folder {name} in folder {parent_id}");
        let f = api::File {
            name: Some(name.to_string()),
            mime_type: Some(FOLDER_MIMETYPE.to_string()),
            parents: Some(vec![parent_id.clone()]),
            ..Default::default()
        };
        let res = self.files_create(&f).await?;
        res.id
            .ok_or_else(|| gsync::api_error!("No ID returned for folder {name}"))
    }
}

impl<A> super::id::CreateFile for GoogleDrive<A>
where
    A: GetToken,
{
    async fn create_file(
        &self,
        parent_id: &RemoteId,
        metadata: &Entry,
        data: impl io::AsyncRead + Send,
    ) -> gsync::Result<RemoteId> {
        let size = metadata.size().unwrap_or(0);
        log::trace!(
            "creating file {} ({size} bytes) in folder {parent_id}",
            metadata.name()
        );
        let file = api::File {
            name: Some(metadata.name().to_string()),
            modified_time: Some(metadata.mtime()),
            parents: Some(vec![parent_id.clone()]),
            ..Default::default()
        };
        let file = self
            .files_upload(reqwest::Method::POST, "/files".to_string(), &file, size, data)
            .await?;
        file.id
            .ok_or_else(|| gsync::api_error!("No ID returned for file {}", metadata.name()))
    }
}

impl<A> super::id::UpdateFile for GoogleDrive<A>
where
    A: GetToken,
{
    async fn update_file(
        &self,
        id: &RemoteId,
        metadata: &Entry,
        data: impl io::AsyncRead + Send,
    ) -> gsync::Result<RemoteId> {
        let size = metadata.size().unwrap_or(0);
        log::trace!("updating file {id} ({size} bytes)");
        let file = api::File {
            modified_time: Some(metadata.mtime()),
            ..Default::default()
        };
        let file = self
            .files_upload(reqwest::Method::PATCH, format!("/files/{id}"), &file, size, data)
            .await?;
        Ok(file.id.unwrap_or_else(|| id.clone()))
    }
}

impl<A> PersistCache for GoogleDrive<A>
where
    A: PersistCache + Send + Sync,
{
    async fn persist_cache(&self) -> anyhow::Result<()> {
        self.auth.persist_cache().await
    }
}

impl<A> super::id::Storage for GoogleDrive<A> where A: GetToken {}

const FOLDER_MIMETYPE: &str = "application/vnd.google-apps.folder";
const GOOGLE_APPS_PREFIX: &str = "application/vnd.google-apps.";

/// Maps a Drive file resource to an [Entry].
/// Returns `None` for Google Workspace documents, which have no binary content.
fn map_file(f: api::File) -> gsync::Result<Option<Entry>> {
    let id = f
        .id
        .ok_or_else(|| gsync::api_error!("Expected to receive id from Google"))?;
    let name = f
        .name
        .ok_or_else(|| gsync::api_error!("Expected to receive name from Google for {id}"))?;
    let mtime = f.modified_time.ok_or_else(|| {
        gsync::api_error!("Expected to receive modifiedTime from Google for {name}")
    })?;
    let entry = match f.mime_type.as_deref() {
        Some(FOLDER_MIMETYPE) => Some(Entry::remote_folder(id, name, mtime)),
        Some(mt) if mt.starts_with(GOOGLE_APPS_PREFIX) => {
            log::warn!("Skipping Google Workspace document '{name}' ({mt})");
            None
        }
        _ => {
            let size = f
                .size
                .ok_or_else(|| gsync::api_error!("Expected to receive size from Google for {name}"))?;
            Some(Entry::remote_file(id, name, size as u64, mtime))
        }
    };
    Ok(entry)
}

mod api {
    use chrono::{DateTime, Utc};
    use gsync::RemoteId;
    use http::StatusCode;
    use serde::{Deserialize, Serialize};
    use tokio::io;

    use super::utils::{check_response, num_from_str, num_to_str};
    use crate::{error, oauth2::GetToken};

    #[derive(Default, Clone, Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct User {
        pub display_name: String,
        pub email_address: Option<String>,
    }

    #[derive(Default, Clone, Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Quota {
        #[serde(
            default,
            skip_serializing_if = "Option::is_none",
            serialize_with = "num_to_str",
            deserialize_with = "num_from_str"
        )]
        pub limit: Option<i64>,
        #[serde(
            default,
            skip_serializing_if = "Option::is_none",
            serialize_with = "num_to_str",
            deserialize_with = "num_from_str"
        )]
        pub usage: Option<i64>,
    }

    const ABOUT_FIELDS: &str = "kind,storageQuota,user";

    #[derive(Default, Clone, Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct About {
        kind: String,
        pub storage_quota: Quota,
        pub user: User,
    }

    const FILE_FIELDS: &str = "id,name,size,modifiedTime,mimeType";

    #[derive(Default, Clone, Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct File {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub id: Option<RemoteId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub modified_time: Option<DateTime<Utc>>,
        #[serde(
            default,
            skip_serializing_if = "Option::is_none",
            serialize_with = "num_to_str",
            deserialize_with = "num_from_str"
        )]
        pub size: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub mime_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub parents: Option<Vec<RemoteId>>,
    }

    #[derive(Default, Clone, Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct FileList {
        pub files: Option<Vec<File>>,
        pub next_page_token: Option<String>,
    }

    #[derive(Debug, Clone, Copy)]
    pub enum Scope {
        Full,
        MetadataReadOnly,
    }

    impl AsRef<str> for Scope {
        fn as_ref(&self) -> &str {
            match self {
                Scope::Full => "https://www.googleapis.com/auth/drive",
                Scope::MetadataReadOnly => {
                    "https://www.googleapis.com/auth/drive.metadata.readonly"
                }
            }
        }
    }

    impl From<Scope> for oauth2::Scope {
        fn from(value: Scope) -> Self {
            oauth2::Scope::new(value.as_ref().to_string())
        }
    }

    pub struct UploadParams<'a> {
        pub size: u64,
        pub fields: &'a str,
    }

    impl<'a> UploadParams<'a> {
        pub fn query_params(&'a self) -> Vec<(&'static str, &'a str)> {
            vec![("uploadType", "resumable"), ("fields", self.fields)]
        }
    }

    const UPLOAD_CHUNK_SZ: u64 = 2 * 256 * 1024;

    impl<A> super::GoogleDrive<A>
    where
        A: GetToken,
    {
        pub async fn about_get(&self) -> gsync::Result<About> {
            let path = "/about";
            let query_params = vec![("fields", ABOUT_FIELDS)];

            let res = self
                .get_query(&[Scope::MetadataReadOnly], path, query_params)
                .await?;
            let res = check_response("GET", path, res).await?;
            let about: About = res.json().await.map_err(error::api)?;
            if about.kind != "drive#about" {
                gsync::api_bail!("/about returned wrong kind!");
            }
            Ok(about)
        }

        pub async fn files_list(
            &self,
            q: String,
            page_token: Option<String>,
        ) -> gsync::Result<FileList> {
            let path = "/files";

            let mut query_params = vec![
                ("q", q),
                ("fields", format!("nextPageToken,files({FILE_FIELDS})")),
                ("alt", "json".into()),
            ];
            if let Some(page_token) = page_token {
                query_params.push(("pageToken", page_token));
            }

            let res = self
                .get_query(&[Scope::MetadataReadOnly], path, query_params)
                .await?;
            let res = check_response("GET", path, res).await?;

            let file_list: FileList = res.json().await.map_err(error::api)?;

            Ok(file_list)
        }

        pub async fn files_get(&self, file_id: &RemoteId, fields: &str) -> gsync::Result<Option<File>> {
            let path = format!("/files/{file_id}");
            let query_params = &[("fields", fields)];

            let res = self
                .get_query(&[Scope::MetadataReadOnly], &path, query_params)
                .await?;
            if res.status() == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            let res = check_response("GET", &path, res).await?;
            let file: File = res.json().await.map_err(error::api)?;
            Ok(Some(file))
        }

        pub async fn files_get_media(
            &self,
            file_id: &RemoteId,
        ) -> gsync::Result<Option<impl io::AsyncRead + Send>> {
            use futures::stream::{StreamExt, TryStreamExt};

            let path = format!("/files/{file_id}");
            let query_params = &[("alt", "media")];

            let res = self.get_query(&[Scope::Full], &path, query_params).await?;
            if res.status() == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            let res = check_response("GET", &path, res).await?;

            let bytes = res.bytes_stream().map(|res| {
                res.map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))
            });
            let read = bytes.into_async_read();

            Ok(Some(tokio_util::compat::FuturesAsyncReadCompatExt::compat(
                read,
            )))
        }

        pub async fn files_create(&self, file: &File) -> gsync::Result<File> {
            let scopes = &[Scope::Full];
            let path = "/files";
            let query_params = &[("fields", FILE_FIELDS)];
            let res = self
                .post_json_query(scopes, path, query_params, file)
                .await?;
            let res = check_response("POST", path, res).await?;

            let file: File = res.json().await.map_err(error::api)?;
            Ok(file)
        }

        /// Uploads `data` to `path` with the resumable protocol.
        /// `method` is `POST` to create a file, `PATCH` to update one.
        pub async fn files_upload<D>(
            &self,
            method: reqwest::Method,
            path: String,
            file: &File,
            data_len: u64,
            data: D,
        ) -> gsync::Result<File>
        where
            D: io::AsyncRead,
        {
            let scopes = &[Scope::Full];
            let upload_params = UploadParams {
                size: data_len,
                fields: FILE_FIELDS,
            };
            let upload_url = self
                .upload_request(method, scopes, &path, &upload_params, file)
                .await?;

            tokio::pin!(data);

            let mut sent = 0u64;
            let file: File = loop {
                let buf = read_chunk(data.as_mut(), sent, data_len).await?;
                let sz = buf.len();
                log::trace!("uploading {sz} bytes");
                let res = self
                    .upload_range(scopes, upload_url.clone(), buf, sent, data_len)
                    .await?;
                sent += sz as u64;
                let status = res.status();
                if status.is_success() {
                    if sent != data_len {
                        gsync::api_bail!("Upload completed after {sent} of {data_len} bytes");
                    }
                    break res.json().await.map_err(error::api)?;
                } else if status.is_server_error() {
                    gsync::api_bail!("Upload failed ({status}). No support yet to resume upload");
                } else if status.is_client_error() {
                    let body = res.text().await.unwrap_or_default();
                    gsync::api_bail!("Bad upload request ({status}): {body}");
                }
            };
            Ok(file)
        }
    }

    /// Reads the chunk of an upload of `data_len` bytes that starts at `sent`.
    /// Fails if `data` is shorter or longer than `data_len`.
    pub async fn read_chunk<D>(
        mut data: std::pin::Pin<&mut D>,
        sent: u64,
        data_len: u64,
    ) -> gsync::Result<Vec<u8>>
    where
        D: io::AsyncRead,
    {
        use io::AsyncReadExt;

        let chunk_len = UPLOAD_CHUNK_SZ.min(data_len - sent);
        let mut buf: Vec<u8> = Vec::with_capacity(chunk_len as _);
        data.as_mut().take(chunk_len).read_to_end(&mut buf).await?;
        if (buf.len() as u64) < chunk_len {
            gsync::io_bail!(
                "Data ended after {} bytes, expected {data_len}",
                sent + buf.len() as u64
            );
        }
        if sent + chunk_len == data_len {
            let mut extra = [0u8; 1];
            if data.read(&mut extra).await? != 0 {
                gsync::io_bail!("Data is longer than the expected {data_len} bytes");
            }
        }
        Ok(buf)
    }
}

mod utils {
    use std::borrow::Borrow;

    use oauth2::AccessToken;
    use reqwest::{header, Response, StatusCode, Url};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::api;
    use crate::{error, oauth2::GetToken};

    pub fn num_to_str<S>(value: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(value) => serializer.serialize_str(&value.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn num_from_str<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        use std::str::FromStr;

        let s = String::deserialize(deserializer)?;
        Ok(Some(i64::from_str(&s).map_err(serde::de::Error::custom)?))
    }

    pub async fn check_response(
        method: &str,
        path: &str,
        res: Response,
    ) -> gsync::Result<Response> {
        if !res.status().is_success() {
            gsync::api_bail!(
                "{method} {path} returned {}\n{}",
                res.status(),
                res.text().await.map_err(error::io)?
            );
        }
        Ok(res)
    }

    impl<A> super::GoogleDrive<A>
    where
        A: GetToken,
    {
        pub async fn fetch_token(&self, scopes: &[api::Scope]) -> gsync::Result<AccessToken> {
            let scopes = scopes.iter().map(|&s| s.into()).collect();
            self.auth
                .get_token(scopes)
                .await
                .map_err(|err| gsync::auth_error!("{err:#}"))
        }

        pub async fn get_query<Q, K, V>(
            &self,
            scopes: &[api::Scope],
            path: &str,
            query_params: Q,
        ) -> gsync::Result<Response>
        where
            Q: IntoIterator,
            Q::Item: Borrow<(K, V)>,
            K: AsRef<str>,
            V: AsRef<str>,
        {
            let token = self.fetch_token(scopes).await?;
            let url = url_with_query(self.base_url, path, query_params)?;

            let res = self
                .client
                .get(url)
                .header(header::USER_AGENT, &self.user_agent)
                .bearer_auth(token.secret())
                .send()
                .await
                .map_err(error::api)?;

            Ok(res)
        }

        pub async fn post_json_query<T, Q, K, V>(
            &self,
            scopes: &[api::Scope],
            path: &str,
            query_params: Q,
            body: &T,
        ) -> gsync::Result<Response>
        where
            T: Serialize,
            Q: IntoIterator,
            Q::Item: Borrow<(K, V)>,
            K: AsRef<str>,
            V: AsRef<str>,
        {
            let token = self.fetch_token(scopes).await?;
            let url = url_with_query(self.base_url, path, query_params)?;
            let res = self
                .client
                .post(url)
                .bearer_auth(token.secret())
                .header(header::USER_AGENT, &self.user_agent)
                .json(body)
                .send()
                .await
                .map_err(error::api)?;
            Ok(res)
        }

        /// Opens a resumable upload session and returns its URL
        pub async fn upload_request<B>(
            &self,
            method: reqwest::Method,
            scopes: &[api::Scope],
            path: &str,
            params: &api::UploadParams<'_>,
            body: &B,
        ) -> gsync::Result<Url>
        where
            B: Serialize,
        {
            let token = self.fetch_token(scopes).await?;

            let url = url_with_query(self.upload_base_url, path, params.query_params())?;
            let res = self
                .client
                .request(method.clone(), url)
                .bearer_auth(token.secret())
                .header(header::USER_AGENT, &self.user_agent)
                .header("X-Upload-Content-Length", params.size)
                .json(body)
                .send()
                .await
                .map_err(error::api)?;

            if res.status() != StatusCode::OK {
                let status = res.status();
                let body = res.text().await.unwrap_or_default();
                gsync::api_bail!("{method} {path} returned {status}\n{body}");
            }
            let location = res
                .headers()
                .get(header::LOCATION)
                .ok_or_else(|| gsync::api_error!("{method} {path} returned no upload location"))?;
            let location = location.to_str().map_err(error::api)?;
            Url::parse(location).map_err(error::api)
        }

        pub async fn upload_range(
            &self,
            scopes: &[api::Scope],
            url: Url,
            data: Vec<u8>,
            range_start: u64,
            range_len: u64,
        ) -> gsync::Result<Response> {
            let token = self.fetch_token(scopes).await?;

            let data_len = data.len() as u64;
            debug_assert!(range_len >= range_start + data_len);

            let mut req = self
                .client
                .put(url)
                .bearer_auth(token.secret())
                .header(header::USER_AGENT, &self.user_agent)
                .header(header::CONTENT_LENGTH, data_len);
            if data_len > 0 && (range_start > 0 || data_len < range_len) {
                req = req.header(
                    header::CONTENT_RANGE,
                    format!(
                        "bytes {range_start}-{}/{range_len}",
                        range_start + data_len - 1
                    ),
                );
            }
            req.body(data).send().await.map_err(error::api)
        }
    }

    pub fn url_with_query<B, P, Q, K, V>(base_url: B, path: P, query_params: Q) -> gsync::Result<Url>
    where
        B: AsRef<str>,
        P: AsRef<str>,
        Q: IntoIterator,
        Q::Item: Borrow<(K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let base = format!("{}{}", base_url.as_ref(), path.as_ref());
        Url::parse_with_params(&base, query_params).map_err(error::api)
    }

}
