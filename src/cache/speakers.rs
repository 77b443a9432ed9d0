use tracing::debug;

use crate::cache::CacheService;
use crate::models::Speaker;

const SPEAKERS_KEY: &str = "speakers";

impl CacheService {
    // Получить спикеров: сначала кеш, потом БД
    pub async fn get_speakers(&self) -> Result<Vec<Speaker>, sqlx::Error> {
        match self.read_json::<Vec<Speaker>>(SPEAKERS_KEY).await {
            Ok(Some(speakers)) => return Ok(speakers),
            Ok(None) => debug!("Speakers cache miss"),
            Err(e) => debug!("Speakers cache unavailable: {}", e),
        }

        let speakers = Speaker::list(&self.db.pool).await?;
        let _ = self.write_json(SPEAKERS_KEY, &speakers).await;
        Ok(speakers)
    }

    // Программа встраивает данные спикера, поэтому сбрасываем оба ключа
    pub async fn invalidate_speakers(&self) {
        self.invalidate(&[SPEAKERS_KEY, super::programs::PROGRAMS_KEY]).await;
    }
}
