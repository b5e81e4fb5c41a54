use anyhow::Context;
use sqlx::SqlitePool;

/// One row of the bundled knowledge base. Ratios follow the record conventions: ROE as a
/// fraction, money in KRW, returns already in percent.
#[derive(Debug, Clone, Copy)]
pub struct SeedCompany {
    pub name: &'static str,
    pub symbol: Option<&'static str>,
    pub sector: Option<&'static str>,
    pub per: Option<f64>,
    pub roe: Option<f64>,
    pub total_debt: Option<f64>,
    pub total_equity: Option<f64>,
    pub revenue: Option<f64>,
    pub market_cap: Option<f64>,
    pub risk_level: Option<&'static str>,
    pub main_products: Option<&'static str>,
    pub current_price: Option<f64>,
    pub returns: [Option<f64>; 6],
}

const JO: f64 = 1.0e12;

pub const SEED_COMPANIES: &[SeedCompany] = &[
    SeedCompany {
        name: "삼성전자",
        symbol: Some("005930.KS"),
        sector: Some("반도체"),
        per: Some(13.2),
        roe: Some(0.089),
        total_debt: Some(92.2 * JO),
        total_equity: Some(363.7 * JO),
        revenue: Some(300.9 * JO),
        market_cap: Some(430.0 * JO),
        risk_level: Some("낮음"),
        main_products: Some("메모리 반도체(DRAM, NAND), 시스템LSI, 파운드리, 스마트폰, 가전"),
        current_price: Some(72_000.0),
        returns: [Some(-3.1), Some(-8.4), Some(18.5), Some(-21.7), Some(24.9), Some(-33.6)],
    },
    SeedCompany {
        name: "SK하이닉스",
        symbol: Some("000660.KS"),
        sector: Some("반도체"),
        per: Some(9.8),
        roe: Some(0.31),
        total_debt: Some(54.1 * JO),
        total_equity: Some(75.3 * JO),
        revenue: Some(66.2 * JO),
        market_cap: Some(140.0 * JO),
        risk_level: Some("중간"),
        main_products: Some("DRAM, HBM, NAND 플래시, 기업용 SSD"),
        current_price: Some(192_000.0),
        returns: [Some(41.2), Some(96.5), Some(78.0), Some(-18.9), Some(140.3), Some(-35.2)],
    },
    SeedCompany {
        name: "LG에너지솔루션",
        symbol: Some("373220.KS"),
        sector: Some("2차전지"),
        per: Some(78.4),
        roe: Some(0.028),
        total_debt: Some(38.4 * JO),
        total_equity: Some(35.6 * JO),
        revenue: Some(25.6 * JO),
        market_cap: Some(86.0 * JO),
        risk_level: Some("높음"),
        main_products: Some("전기차용 리튬이온 배터리, ESS 배터리, 소형 원통형 전지"),
        current_price: Some(368_000.0),
        returns: [Some(-12.6), Some(-20.3), Some(15.1), Some(-34.8), Some(32.4), Some(-48.9)],
    },
    SeedCompany {
        name: "현대차",
        symbol: Some("005380.KS"),
        sector: Some("자동차"),
        per: Some(4.9),
        roe: Some(0.132),
        total_debt: Some(180.2 * JO),
        total_equity: Some(97.4 * JO),
        revenue: Some(175.2 * JO),
        market_cap: Some(48.0 * JO),
        risk_level: Some("중간"),
        main_products: Some("승용차, SUV, 전기차(아이오닉), 상용차, 제네시스 브랜드"),
        current_price: Some(228_000.0),
        returns: [Some(6.8), Some(21.4), Some(29.7), Some(-14.2), Some(55.0), Some(-17.8)],
    },
    SeedCompany {
        name: "NAVER",
        symbol: Some("035420.KS"),
        sector: Some("인터넷 플랫폼"),
        per: Some(21.5),
        roe: Some(0.064),
        total_debt: Some(8.7 * JO),
        total_equity: Some(26.5 * JO),
        revenue: Some(10.7 * JO),
        market_cap: Some(30.5 * JO),
        risk_level: Some("중간"),
        main_products: Some("검색 포털, 커머스, 핀테크(네이버페이), 웹툰, 클라우드"),
        current_price: Some(188_000.0),
        returns: [Some(-1.9), Some(-42.0), Some(22.3), Some(-20.5), Some(24.0), Some(-51.3)],
    },
    SeedCompany {
        name: "카카오",
        symbol: Some("035720.KS"),
        sector: Some("인터넷 플랫폼"),
        per: Some(58.0),
        roe: Some(0.012),
        total_debt: Some(13.9 * JO),
        total_equity: Some(17.2 * JO),
        revenue: Some(8.1 * JO),
        market_cap: Some(17.0 * JO),
        risk_level: Some("높음"),
        main_products: Some("카카오톡 메신저, 광고, 카카오페이, 모빌리티, 엔터테인먼트 콘텐츠"),
        current_price: Some(38_500.0),
        returns: [Some(-28.4), Some(-66.1), Some(9.8), Some(-36.0), Some(12.5), Some(-70.2)],
    },
    SeedCompany {
        name: "셀트리온",
        symbol: Some("068270.KS"),
        sector: Some("바이오"),
        per: Some(95.3),
        roe: Some(0.021),
        total_debt: Some(3.9 * JO),
        total_equity: Some(22.4 * JO),
        revenue: Some(3.6 * JO),
        market_cap: Some(38.0 * JO),
        risk_level: Some("높음"),
        main_products: Some("바이오시밀러(램시마, 트룩시마, 허쥬마), 항체 신약"),
        current_price: Some(176_000.0),
        returns: [Some(2.4), Some(-1.5), Some(26.1), Some(-15.8), Some(38.7), Some(-29.4)],
    },
    SeedCompany {
        name: "에코프로",
        symbol: Some("086520.KQ"),
        sector: Some("2차전지 소재"),
        per: None,
        roe: None,
        total_debt: None,
        total_equity: None,
        revenue: Some(3.1 * JO),
        market_cap: Some(11.5 * JO),
        risk_level: Some("높음"),
        main_products: Some("양극재 지주사, 전구체, 리튬 가공, 환경 소재"),
        current_price: None,
        returns: [Some(-45.1), None, Some(12.0), Some(-58.3), None, None],
    },
];

/// Inserts the bundled rows when the table is empty. Returns the number of rows written.
pub async fn seed_if_empty(pool: &SqlitePool) -> anyhow::Result<u64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM companies")
        .fetch_one(pool)
        .await
        .context("count companies failed")?;
    if count > 0 {
        tracing::debug!(rows = count, "local store already seeded");
        return Ok(0);
    }

    let mut tx = pool.begin().await.context("begin transaction failed")?;
    let mut qb = sqlx::QueryBuilder::<sqlx::Sqlite>::new(
        "INSERT INTO companies (name, symbol, sector, per, roe, total_debt, total_equity, revenue, \
         market_cap, risk_level, main_products, current_price, return_1y, return_3y, \
         max_return_1y, max_loss_1y, max_return_3y, max_loss_3y) ",
    );
    qb.push_values(SEED_COMPANIES, |mut b, c| {
        b.push_bind(c.name)
            .push_bind(c.symbol)
            .push_bind(c.sector)
            .push_bind(c.per)
            .push_bind(c.roe)
            .push_bind(c.total_debt)
            .push_bind(c.total_equity)
            .push_bind(c.revenue)
            .push_bind(c.market_cap)
            .push_bind(c.risk_level)
            .push_bind(c.main_products)
            .push_bind(c.current_price);
        for r in c.returns {
            b.push_bind(r);
        }
    });
    qb.push(" ON CONFLICT (name) DO NOTHING");

    let res = qb
        .build()
        .execute(&mut *tx)
        .await
        .context("seed companies failed")?;
    tx.commit().await.context("commit transaction failed")?;

    tracing::info!(rows = res.rows_affected(), "seeded local store");
    Ok(res.rows_affected())
}
