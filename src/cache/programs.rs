use tracing::debug;

use crate::cache::CacheService;
use crate::models::Program;

pub(super) const PROGRAMS_KEY: &str = "programs";

impl CacheService {
    pub async fn get_programs(&self) -> Result<Vec<Program>, sqlx::Error> {
        match self.read_json::<Vec<Program>>(PROGRAMS_KEY).await {
            Ok(Some(programs)) => return Ok(programs),
            Ok(None) => debug!("Programs cache miss"),
            Err(e) => debug!("Programs cache unavailable: {}", e),
        }

        let programs = Program::list(&self.db.pool).await?;
        let _ = self.write_json(PROGRAMS_KEY, &programs).await;
        Ok(programs)
    }

    pub async fn invalidate_programs(&self) {
        self.invalidate(&[PROGRAMS_KEY]).await;
    }
}
