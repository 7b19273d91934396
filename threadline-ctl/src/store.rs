use async_trait::async_trait;
use threadline_client::api::{
    ActivityEntry, CommentNode, DiscussionId, Error, LikeRequest, NewReply, Store,
};

/// `Store` backed by a running threadline-server
pub struct HttpStore {
    host: String,
    client: reqwest::Client,
}

fn transport_error(err: reqwest::Error) -> Error {
    match err.is_connect() || err.is_timeout() {
        true => Error::Unavailable(err.to_string()),
        false => Error::Unknown(err.to_string()),
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.bytes().await.map_err(transport_error)?;
    Err(Error::parse(&body).unwrap_or_else(|err| {
        Error::Unknown(format!("server answered {status} with unparseable error: {err:#}"))
    }))
}

impl HttpStore {
    pub fn new(host: String) -> HttpStore {
        HttpStore {
            host,
            client: reqwest::Client::new(),
        }
    }

    async fn get<R>(&self, path: &str) -> Result<R, Error>
    where
        R: for<'de> serde::Deserialize<'de>,
    {
        let resp = self
            .client
            .get(format!("{}/api/{}", self.host, path))
            .send()
            .await
            .map_err(transport_error)?;
        check_status(resp)
            .await?
            .json()
            .await
            .map_err(transport_error)
    }

    async fn post<B>(&self, path: &str, body: &B) -> Result<reqwest::Response, Error>
    where
        B: serde::Serialize,
    {
        let resp = self
            .client
            .post(format!("{}/api/{}", self.host, path))
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(resp).await
    }

    pub async fn fetch_activity(&self, discussion: &DiscussionId) -> Result<Vec<ActivityEntry>, Error> {
        self.get(&format!("discussions/{discussion}/activity")).await
    }
}

#[async_trait]
impl Store for HttpStore {
    async fn fetch_comments(&self, discussion: &DiscussionId) -> Result<Vec<CommentNode>, Error> {
        self.get(&format!("discussions/{discussion}/comments")).await
    }

    async fn record_like(&self, req: LikeRequest) -> Result<(), Error> {
        self.post("like", &req).await.map(|_| ())
    }

    async fn submit_reply(&self, reply: NewReply) -> Result<CommentNode, Error> {
        self.post("reply", &reply)
            .await?
            .json()
            .await
            .map_err(transport_error)
    }

    async fn log_activity(&self, entry: ActivityEntry) -> Result<(), Error> {
        self.post("activity", &entry).await.map(|_| ())
    }
}
