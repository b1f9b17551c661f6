use crate::chart::{self, format_count, PieChart, Slice};
use crate::config::AppConfig;
use crate::error::RenderError;
use crate::processing::{MapLayers, RegionCluster};
use crate::types::PointRecord;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tera::{escape_html, Context, Tera};
use tracing::{debug, info};

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <title>{{ title }}</title>
    <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" />
    <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
    <link rel="stylesheet" href="https://unpkg.com/leaflet.markercluster@1.4.1/dist/MarkerCluster.css" />
    <link rel="stylesheet" href="https://unpkg.com/leaflet.markercluster@1.4.1/dist/MarkerCluster.Default.css" />
    <script src="https://unpkg.com/leaflet.markercluster@1.4.1/dist/leaflet.markercluster.js"></script>
    <link rel="stylesheet" href="https://netdna.bootstrapcdn.com/bootstrap/3.0.0/css/bootstrap-glyphicons.css" />
    <link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.css" />
    <script src="https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.js"></script>
    <style>
        html, body { width: 100%; height: 100%; margin: 0; padding: 0; }
        #map { position: absolute; top: 0; bottom: 0; left: 0; right: 0; }
        .map-title {
            position: fixed;
            top: 0;
            left: 50%;
            transform: translateX(-50%);
            margin: 10px 0 0 0;
            text-align: center;
            font-family: Tahoma;
            font-size: 14px;
            font-weight: bold;
            color: darkgrey;
            z-index: 10000;
        }
        .map-source {
            position: fixed;
            bottom: 10px;
            right: 10px;
            background-color: rgba(255, 255, 255, 0.8);
            padding: 5px;
            border-radius: 5px;
            font-family: Tahoma;
            font-size: 12px;
            font-weight: bold;
            box-shadow: 0px 0px 5px rgba(0, 0, 0, 0.3);
            z-index: 10000;
        }
        .map-source a { text-decoration: none; color: darkgrey; }
    </style>
</head>
<body>
    <div id="map"></div>
    <h3 class="map-title">{{ title }}</h3>
    <div class="map-source">
        <a href="{{ attribution_url }}" target="_blank" rel="noopener">{{ attribution_text }}</a>
    </div>
    <script>
        const map = L.map('map', { center: [{{ center_lat }}, {{ center_lon }}], zoom: {{ zoom }} });
        L.tileLayer('https://tile.openstreetmap.org/{z}/{x}/{y}.png', {
            maxZoom: 19,
            attribution: '&copy; OpenStreetMap contributors'
        }).addTo(map);

        const clusters = {{ clusters | safe }};
        const layerControl = L.control.layers(null, null, { collapsed: true });
        for (const cluster of clusters) {
            const group = L.markerClusterGroup();
            const icon = L.AwesomeMarkers.icon({
                icon: cluster.icon.glyph,
                markerColor: cluster.icon.color,
                prefix: 'glyphicon'
            });
            for (const m of cluster.markers) {
                const marker = L.marker([m.lat, m.lon], { icon: icon });
                marker.bindPopup(m.popup, { maxWidth: 300 });
                if (m.tooltip !== null) {
                    marker.bindTooltip(m.tooltip);
                }
                group.addLayer(marker);
            }
            group.addTo(map);
            layerControl.addOverlay(group, cluster.name);
        }
        layerControl.addTo(map);
    </script>
</body>
</html>
"#;

const PRIMARY_POPUP_TEMPLATE: &str = r#"<div style="max-width: 300px;">
    <b>{{ region_label }}:</b> {{ region }} <br>
    <b>{{ sub_region_label }}:</b> {{ sub_region }} <br>
    <b>{{ total_label }}:</b> {{ total }} <br>
    {{ chart | safe }}
</div>"#;

const POINT_POPUP_TEMPLATE: &str = r#"<b>{{ name_label }}:</b> {{ name }} <br>
<b>{{ region_label }}:</b> {{ region }} <br>
<b>{{ sub_region_label }}:</b> {{ sub_region }}"#;

#[derive(Debug, Serialize)]
struct IconView<'a> {
    color: &'a str,
    glyph: &'a str,
}

#[derive(Debug, Serialize)]
struct MarkerView {
    lat: f64,
    lon: f64,
    popup: String,
    tooltip: Option<String>,
}

#[derive(Debug, Serialize)]
struct ClusterView<'a> {
    name: String,
    icon: IconView<'a>,
    markers: Vec<MarkerView>,
}

/// Compiled templates for one render.
struct Templates {
    tera: Tera,
}

impl Templates {
    fn new() -> Result<Self, RenderError> {
        let mut tera = Tera::default();
        // `.html` names switch on autoescaping
        tera.add_raw_templates(vec![
            ("page.html", PAGE_TEMPLATE),
            ("primary_popup.html", PRIMARY_POPUP_TEMPLATE),
            ("point_popup.html", POINT_POPUP_TEMPLATE),
            ("pie.html", chart::PIE_TEMPLATE),
        ])?;
        Ok(Self { tera })
    }

    fn render(&self, name: &str, context: &Context) -> Result<String, RenderError> {
        Ok(self.tera.render(name, context)?)
    }
}

/// Render the complete standalone HTML document.
pub fn render_html(config: &AppConfig, layers: &MapLayers) -> Result<String, RenderError> {
    let templates = Templates::new()?;
    let map = &config.map;

    let mut clusters = Vec::with_capacity(layers.regions.len() + 1);
    for region in &layers.regions {
        clusters.push(region_cluster(&templates, config, layers, region)?);
    }
    clusters.push(points_cluster(&templates, config, &layers.points)?);
    debug!("Rendering {} clusters", clusters.len());

    let mut context = Context::new();
    context.insert("title", &map.title);
    context.insert("attribution_text", &map.attribution_text);
    context.insert("attribution_url", &map.attribution_url);
    context.insert("center_lat", &layers.center.y().to_string());
    context.insert("center_lon", &layers.center.x().to_string());
    context.insert("zoom", &map.zoom_start);
    context.insert("clusters", &script_json(&clusters)?);

    templates.render("page.html", &context)
}

fn region_cluster<'a>(
    templates: &Templates,
    config: &'a AppConfig,
    layers: &MapLayers,
    cluster: &RegionCluster,
) -> Result<ClusterView<'a>, RenderError> {
    let columns = &config.columns;
    let map = &config.map;
    let slice_a = Slice { label: &columns.subgroup_a, color: &map.subgroup_a_color };
    let slice_b = Slice { label: &columns.subgroup_b, color: &map.subgroup_b_color };

    let mut markers = Vec::with_capacity(cluster.records.len());
    for record in &cluster.records {
        let pie = PieChart::new(record.subgroup_a, record.subgroup_b);
        let pie_html = templates.render("pie.html", &pie.context(&slice_a, &slice_b))?;

        let mut context = Context::new();
        context.insert("region_label", &columns.region);
        context.insert("region", &record.region);
        context.insert("sub_region_label", &columns.sub_region);
        context.insert("sub_region", record.sub_region.as_deref().unwrap_or_default());
        context.insert("total_label", &columns.total);
        context.insert("total", &format_count(record.total));
        context.insert("chart", &pie_html);

        let tooltip = match &record.sub_region {
            Some(name) => format!("{}: {}", columns.sub_region, name),
            None => format!("No {} Name", columns.sub_region),
        };

        markers.push(MarkerView {
            lat: record.location.y(),
            lon: record.location.x(),
            popup: templates.render("primary_popup.html", &context)?,
            tooltip: Some(escape_html(&tooltip)),
        });
    }

    let mut name = format!("{}{}", map.primary_layer_prefix, cluster.region);
    if map.show_region_totals {
        if let Some((_, total)) = layers.region_totals.iter().find(|(r, _)| *r == cluster.region) {
            name.push_str(&format!(" ({})", format_count(*total)));
        }
    }

    Ok(ClusterView {
        name: escape_html(&name),
        icon: IconView { color: &map.primary_icon_color, glyph: &map.icon_glyph },
        markers,
    })
}

fn points_cluster<'a>(
    templates: &Templates,
    config: &'a AppConfig,
    points: &[PointRecord],
) -> Result<ClusterView<'a>, RenderError> {
    let columns = &config.columns;
    let map = &config.map;

    let mut markers = Vec::with_capacity(points.len());
    for point in points {
        let mut context = Context::new();
        context.insert("name_label", &columns.point_name);
        context.insert("name", &point.name);
        context.insert("region_label", &columns.region);
        context.insert("region", &point.region);
        context.insert("sub_region_label", &columns.sub_region);
        context.insert("sub_region", &point.sub_region);

        markers.push(MarkerView {
            lat: point.location.y(),
            lon: point.location.x(),
            popup: templates.render("point_popup.html", &context)?,
            tooltip: None,
        });
    }

    Ok(ClusterView {
        name: escape_html(&map.points_layer_name),
        icon: IconView { color: &map.points_icon_color, glyph: &map.icon_glyph },
        markers,
    })
}

/// JSON that is safe to drop inside a `<script>` element.
fn script_json<T: Serialize>(value: &T) -> Result<String, RenderError> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

/// Write the document, creating parent directories as needed.
pub fn write_html(path: &Path, html: &str) -> Result<(), RenderError> {
    let io_err = |source: std::io::Error| RenderError::Io { path: path.to_path_buf(), source };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, html).map_err(io_err)?;
    info!("Wrote {} bytes to {:?}", html.len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::cluster_by_region;
    use crate::types::PrimaryRecord;
    use geo::Point;

    fn record(region: &str, sub_region: Option<&str>, lon: f64, lat: f64) -> PrimaryRecord {
        PrimaryRecord {
            region: region.to_string(),
            sub_region: sub_region.map(str::to_string),
            location: Point::new(lon, lat),
            total: 12500.0,
            subgroup_a: 30.0,
            subgroup_b: 70.0,
        }
    }

    fn layers() -> MapLayers {
        MapLayers {
            center: Point::new(72.5, 31.25),
            regions: cluster_by_region(vec![
                record("Lahore", Some("Lahore City"), 74.3, 31.5),
                record("Multan", None, 71.4, 30.2),
                record("Lahore", Some("Model Town"), 74.3, 31.4),
            ]),
            points: vec![PointRecord {
                sub_region: "Lahore City".to_string(),
                region: "Lahore".to_string(),
                name: "Govt <Girls> School".to_string(),
                location: Point::new(74.31, 31.52),
            }],
            region_totals: vec![("Lahore".to_string(), 1200.0)],
        }
    }

    fn clusters_json(html: &str) -> serde_json::Value {
        let start = html.find("const clusters = ").unwrap() + "const clusters = ".len();
        let end = start + html[start..].find(";\n").unwrap();
        serde_json::from_str(&html[start..end].replace("<\\/", "</")).unwrap()
    }

    #[test]
    fn page_has_center_zoom_and_overlays() {
        let html = render_html(&AppConfig::default(), &layers()).unwrap();
        assert!(html.contains("center: [31.25, 72.5], zoom: 6"));
        assert!(html.contains("Visualization of Out of School Children and Schools in Pakistan"));
        assert!(html.contains("Pak Alliance for Maths and Science"));
        assert!(html.contains("L.control.layers"));
        assert!(html.contains("z-index: 10000"));
    }

    #[test]
    fn one_cluster_per_region_plus_points() {
        let html = render_html(&AppConfig::default(), &layers()).unwrap();
        let clusters = clusters_json(&html);
        let clusters = clusters.as_array().unwrap();

        assert_eq!(clusters.len(), 3);
        assert_eq!(clusters[0]["name"], "Primary Data - Lahore");
        assert_eq!(clusters[0]["markers"].as_array().unwrap().len(), 2);
        assert_eq!(clusters[1]["name"], "Primary Data - Multan");
        assert_eq!(clusters[2]["name"], "Schools Cluster");
        assert_eq!(clusters[0]["icon"]["color"], "blue");
        assert_eq!(clusters[2]["icon"]["color"], "orange");
    }

    #[test]
    fn primary_popup_and_tooltip() {
        let html = render_html(&AppConfig::default(), &layers()).unwrap();
        let clusters = clusters_json(&html);

        let marker = &clusters[0]["markers"][0];
        let popup = marker["popup"].as_str().unwrap();
        assert!(popup.contains("<b>District:</b> Lahore"));
        assert!(popup.contains("<b>Tehsil:</b> Lahore City"));
        assert!(popup.contains("<b>Total OOSC:</b> 12,500"));
        assert!(popup.contains("<b>Male:</b> 30 (30.0%)"));
        assert!(popup.contains("<svg"));
        assert_eq!(marker["tooltip"], "Tehsil: Lahore City");
        assert_eq!(marker["lat"], 31.5);

        let unnamed = &clusters[1]["markers"][0];
        assert_eq!(unnamed["tooltip"], "No Tehsil Name");
    }

    #[test]
    fn point_popup_is_escaped() {
        let html = render_html(&AppConfig::default(), &layers()).unwrap();
        let clusters = clusters_json(&html);
        let point = &clusters[2]["markers"][0];
        let popup = point["popup"].as_str().unwrap();
        assert!(popup.contains("<b>School Name:</b> Govt &lt;Girls&gt; School"));
        assert!(point["tooltip"].is_null());
        assert!(!html.contains("</b> Govt"), "script json must not contain a raw closing tag");
    }

    #[test]
    fn region_totals_label_layers_when_enabled() {
        let mut config = AppConfig::default();
        let html = render_html(&config, &layers()).unwrap();
        assert!(!html.contains("Primary Data - Lahore (1,200)"));

        config.map.show_region_totals = true;
        let html = render_html(&config, &layers()).unwrap();
        let clusters = clusters_json(&html);
        assert_eq!(clusters[0]["name"], "Primary Data - Lahore (1,200)");
        assert_eq!(clusters[1]["name"], "Primary Data - Multan");
    }

    #[test]
    fn write_html_creates_parent_dirs() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("site").join("map.html");
        write_html(&path, "<html></html>").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "<html></html>");
    }
}
