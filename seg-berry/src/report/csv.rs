//! CSV 输出. 无定义的值写为空字段.

use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::longitudinal::{region_name, TrendResult, VolumeTable};
use crate::pairwise::MetricRecord;

/// 会话比较结果的列.
pub const METRICS_HEADER: &str =
    "session1,session2,label,volume1,volume2,volume_diff,dice,surface_dice,hd95,subject";

/// 趋势结果的列.
pub const TRENDS_HEADER: &str = "subject,region,slope,intercept,r_squared,p_value,n";

/// 含逗号, 引号或换行的字段加引号.
fn field(s: &str) -> Cow<'_, str> {
    if s.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", s.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(s)
    }
}

#[inline]
fn opt(v: Option<f64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

/// 写出会话比较结果.
pub fn write_metrics<W: Write>(mut w: W, records: &[MetricRecord]) -> io::Result<()> {
    writeln!(w, "{METRICS_HEADER}")?;
    for r in records {
        writeln!(
            w,
            "{},{},{},{},{},{},{},{},{},{}",
            field(&r.session_a),
            field(&r.session_b),
            r.label,
            r.volume_a,
            r.volume_b,
            r.volume_diff,
            opt(r.dice),
            r.surface_dice,
            opt(r.hd95),
            field(&r.subject),
        )?;
    }
    w.flush()
}

/// 写出区域体积表. 列为 `subject,session,time_point` 加上每个区域一列.
pub fn write_volume_table<W: Write>(mut w: W, table: &VolumeTable) -> io::Result<()> {
    let labels = table.labels();
    write!(w, "subject,session,time_point")?;
    for l in labels.iter() {
        write!(w, ",{}", region_name(*l))?;
    }
    writeln!(w)?;

    for row in table.rows() {
        write!(
            w,
            "{},{},{}",
            field(&row.subject),
            field(&row.session),
            opt(row.time_point)
        )?;
        for l in labels.iter() {
            write!(w, ",{}", opt(row.volumes.get(l).copied()))?;
        }
        writeln!(w)?;
    }
    w.flush()
}

/// 写出趋势结果. 合并模式下 `subject` 列为空.
pub fn write_trends<W: Write>(mut w: W, trends: &[TrendResult]) -> io::Result<()> {
    writeln!(w, "{TRENDS_HEADER}")?;
    for t in trends {
        writeln!(
            w,
            "{},{},{},{},{},{},{}",
            field(t.subject.as_deref().unwrap_or_default()),
            t.region,
            t.slope,
            t.intercept,
            t.r_squared,
            t.p_value,
            t.n
        )?;
    }
    w.flush()
}

/// 创建 `path` (及其上级目录), 并以缓冲方式交给 `op` 写入.
pub fn save_csv<P, F>(path: P, op: F) -> io::Result<()>
where
    P: AsRef<Path>,
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut w = BufWriter::new(File::create(path)?);
    op(&mut w)?;
    w.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::longitudinal::VolumeRow;

    fn record(label: u16, dice: Option<f64>, hd95: Option<f64>) -> MetricRecord {
        MetricRecord {
            subject: "sub-01".to_string(),
            session_a: "ses-1".to_string(),
            session_b: "ses-2".to_string(),
            label,
            volume_a: 27.0,
            volume_b: 0.0,
            volume_diff: -27.0,
            dice,
            surface_dice: 0.0,
            hd95,
        }
    }

    #[test]
    fn test_write_metrics() {
        let mut buf = Vec::new();
        write_metrics(&mut buf, &[record(17, Some(0.5), Some(1.25)), record(4, Some(0.0), None)]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], METRICS_HEADER);
        assert_eq!(lines[1], "ses-1,ses-2,17,27,0,-27,0.5,0,1.25,sub-01");
        assert_eq!(lines[2], "ses-1,ses-2,4,27,0,-27,0,0,,sub-01");
    }

    #[test]
    fn test_write_volume_table() {
        let table: VolumeTable = [
            VolumeRow {
                subject: "a,b".to_string(),
                session: "ses-1".to_string(),
                time_point: Some(1.0),
                volumes: [(2, 8.0)].into_iter().collect(),
            },
            VolumeRow {
                subject: "c".to_string(),
                session: "pre".to_string(),
                time_point: None,
                volumes: [(5, 1.5)].into_iter().collect(),
            },
        ]
        .into_iter()
        .collect();
        let mut buf = Vec::new();
        write_volume_table(&mut buf, &table).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "subject,session,time_point,region_2,region_5\n\"a,b\",ses-1,1,8,\nc,pre,,,1.5\n"
        );
    }

    #[test]
    fn test_write_trends_and_save() {
        let t = TrendResult {
            subject: None,
            label: 17,
            region: region_name(17),
            slope: 10.0,
            intercept: 100.0,
            r_squared: 1.0,
            p_value: 0.0,
            n: 3,
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("trends.csv");
        save_csv(&path, |w| write_trends(w, &[t])).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            format!("{TRENDS_HEADER}\n,region_17,10,100,1,0,3\n")
        );
    }
}
