use sqlx::PgPool;
use tracing::info;

/// A single schema step. Steps are applied in list order, each exactly once;
/// the applied tag is recorded so restarts are no-ops.
pub struct Migration {
    pub tag: &'static str,
    pub sql: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        tag: "0001_create_users",
        sql: r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGSERIAL PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                email VARCHAR(255) UNIQUE NOT NULL,
                password VARCHAR(255) NOT NULL,
                role VARCHAR(50) NOT NULL CHECK (role IN ('employee', 'manager')),
                employee_code VARCHAR(50) UNIQUE NOT NULL,
                department VARCHAR(255),
                manager_id BIGINT REFERENCES users(id) ON DELETE SET NULL,
                last_login_at TIMESTAMPTZ,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                CHECK (
                    (role = 'employee' AND manager_id IS NOT NULL)
                    OR (role = 'manager' AND manager_id IS NULL)
                )
            )
        "#,
    },
    Migration {
        tag: "0002_create_attendance",
        sql: r#"
            CREATE TABLE IF NOT EXISTS attendance (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                date DATE NOT NULL,
                check_in TIMESTAMP,
                check_out TIMESTAMP,
                status VARCHAR(50) NOT NULL
                    CHECK (status IN ('present', 'absent', 'late', 'half-day')),
                total_hours DOUBLE PRECISION,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                UNIQUE (user_id, date)
            )
        "#,
    },
    Migration {
        tag: "0003_create_refresh_tokens",
        sql: r#"
            CREATE TABLE IF NOT EXISTS refresh_tokens (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                jti VARCHAR(64) UNIQUE NOT NULL,
                revoked BOOLEAN NOT NULL DEFAULT FALSE,
                expires_at TIMESTAMPTZ NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
        "#,
    },
    Migration {
        tag: "0004_index_attendance_user_date",
        sql: "CREATE INDEX IF NOT EXISTS idx_attendance_user_date ON attendance(user_id, date)",
    },
    Migration {
        tag: "0005_index_attendance_date",
        sql: "CREATE INDEX IF NOT EXISTS idx_attendance_date ON attendance(date)",
    },
    Migration {
        tag: "0006_index_users_role",
        sql: "CREATE INDEX IF NOT EXISTS idx_users_role ON users(role)",
    },
    Migration {
        tag: "0007_index_users_manager",
        sql: "CREATE INDEX IF NOT EXISTS idx_users_manager ON users(manager_id)",
    },
];

/// Apply pending migrations. Called once at startup, before the server binds;
/// any failure here is fatal to the process.
pub async fn run(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            tag TEXT PRIMARY KEY,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    for migration in MIGRATIONS {
        let applied: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM schema_migrations WHERE tag = $1)",
        )
        .bind(migration.tag)
        .fetch_one(pool)
        .await?;

        if applied {
            continue;
        }

        let mut tx = pool.begin().await?;
        sqlx::query(migration.sql).execute(&mut *tx).await?;
        sqlx::query("INSERT INTO schema_migrations (tag) VALUES ($1)")
            .bind(migration.tag)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(tag = migration.tag, "Applied migration");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_unique_and_ordered() {
        let tags: Vec<&str> = MIGRATIONS.iter().map(|m| m.tag).collect();
        let mut sorted = tags.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(tags, sorted, "migration tags must be unique and in order");
    }

    #[test]
    fn steps_are_single_statements() {
        // Each step runs as one prepared statement; a stray semicolon would
        // break that at startup.
        for migration in MIGRATIONS {
            assert!(!migration.sql.trim().trim_end_matches(';').contains(';'), "{}", migration.tag);
            assert!(!migration.sql.trim().is_empty(), "{}", migration.tag);
        }
    }
}
